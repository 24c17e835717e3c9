pub mod scheduler;

pub use scheduler::{merge_directory, merge_files, MergeError, MergeOptions, MergeSummary};
