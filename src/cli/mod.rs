pub mod merge;
pub mod search;
