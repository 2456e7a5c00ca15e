//! Output generation for the daily digest.
//!
//! The only output format is Markdown: one document per run, named after
//! the target date, with a section per source. Rendering is a pure
//! transform over the day's records; writing the file is a separate step so
//! a broken output directory can never corrupt what was already persisted.

pub mod markdown;
