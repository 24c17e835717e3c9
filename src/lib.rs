//! logloom: merges independently-rotated device log files into one
//! chronologically consistent stream.
//!
//! The core pipeline: per-file [`source::cursor::SourceCursor`]s decode lines
//! into [`entry::LogEntry`] values (correcting timezone jumps along the way),
//! and the [`merge`] scheduler combines them with a streaming k-way merge.
//! [`search`] filters the merged output.

pub mod cli;
pub mod config;
pub mod entry;
pub mod merge;
pub mod search;
pub mod source;
