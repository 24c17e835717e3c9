use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::entry::LogEntry;
use crate::search::{search, SearchError, SearchQuery};
use crate::source::cursor::{CursorError, SourceCursor};

#[derive(Debug, Error)]
pub enum SearchCliError {
    #[error("failed to read {path}: {source}")]
    Cursor {
        path: PathBuf,
        #[source]
        source: CursorError,
    },

    #[error("search error: {0}")]
    Search(#[from] SearchError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

const LOAD_BATCH: usize = 1000;

/// Load a merged JSONL file and print the entries matching the query.
pub fn run(file: PathBuf, query: SearchQuery) -> Result<(), SearchCliError> {
    let entries = load_entries(&file)?;
    info!(file = %file.display(), entries = entries.len(), "loaded merged entries");

    let hits = search(&entries, &query)?;
    info!(hits = hits.len(), "search complete");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    for entry in &hits {
        serde_json::to_writer(&mut out, entry).map_err(std::io::Error::from)?;
        writeln!(out)?;
    }
    Ok(())
}

fn load_entries(file: &Path) -> Result<Vec<LogEntry>, SearchCliError> {
    let wrap = |source| SearchCliError::Cursor {
        path: file.to_path_buf(),
        source,
    };
    let mut cursor = SourceCursor::open(file, None).map_err(wrap)?;
    let mut entries = Vec::new();
    loop {
        let batch = cursor.next_batch(LOAD_BATCH).map_err(wrap)?;
        if batch.is_empty() {
            break;
        }
        entries.extend(batch);
    }
    // Restore per-record identity for display and `top` semantics.
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.id = i as u64;
    }
    Ok(entries)
}
