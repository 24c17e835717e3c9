use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::entry::{LogEntry, SourceKind};
use crate::source::cursor::{CursorError, SourceCursor};
use crate::source::fields::FieldRules;

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("failed to scan directory {path}: {source}")]
    Discover {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Strategy selector and sizing for one merge session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Warmup mode: deliver a bounded per-kind preview before the full merge.
    #[serde(default)]
    pub warmup: bool,
    #[serde(default = "default_warmup_per_type_limit")]
    pub warmup_per_type_limit: usize,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_warmup_per_type_limit() -> usize {
    20
}

fn default_batch_size() -> usize {
    500
}

impl Default for MergeOptions {
    fn default() -> Self {
        Self {
            warmup: false,
            warmup_per_type_limit: default_warmup_per_type_limit(),
            batch_size: default_batch_size(),
        }
    }
}

/// Outcome of a merge session.
///
/// `excluded_sources` is the side channel listing sources that failed to open
/// or read; their absence is otherwise silent.
#[derive(Debug, Clone, Default)]
pub struct MergeSummary {
    pub entries: u64,
    pub batches: u64,
    pub excluded_sources: Vec<String>,
    /// True when the session stopped at a cancellation check between batches.
    pub cancelled: bool,
}

/// One open cursor plus its read-ahead buffer.
struct ActiveCursor {
    cursor: SourceCursor,
    buffer: VecDeque<LogEntry>,
    exhausted: bool,
}

impl ActiveCursor {
    /// Refill the read-ahead buffer from the file when it runs dry.
    fn fill(&mut self, fetch: usize) -> Result<(), CursorError> {
        if self.buffer.is_empty() && !self.exhausted {
            let batch = self.cursor.next_batch(fetch)?;
            if batch.is_empty() {
                self.exhausted = true;
            } else {
                self.buffer.extend(batch);
            }
        }
        Ok(())
    }

    fn pop(&mut self) -> Option<LogEntry> {
        self.buffer.pop_front()
    }
}

/// Merge every recognized log file under `dir` into one ordered stream.
///
/// Discovers `*.log` and `*.jsonl` files (name-sorted), opens one cursor per
/// file, and delivers batches to `on_batch` in emission order. A source that
/// fails to open is excluded and listed in the summary, not fatal. An empty
/// directory completes with zero batches.
pub async fn merge_directory<F>(
    dir: &Path,
    rules: &[Arc<FieldRules>],
    options: &MergeOptions,
    cancel: &CancellationToken,
    on_batch: F,
) -> Result<MergeSummary, MergeError>
where
    F: FnMut(Vec<LogEntry>),
{
    let paths = discover_sources(dir).map_err(|source| MergeError::Discover {
        path: dir.to_path_buf(),
        source,
    })?;
    info!(dir = %dir.display(), sources = paths.len(), "discovered log sources");
    merge_files(&paths, rules, options, cancel, on_batch).await
}

/// Merge an explicit list of files. Entry point for callers that inject their
/// own discovery step; `merge_directory` delegates here.
pub async fn merge_files<F>(
    paths: &[PathBuf],
    rules: &[Arc<FieldRules>],
    options: &MergeOptions,
    cancel: &CancellationToken,
    mut on_batch: F,
) -> Result<MergeSummary, MergeError>
where
    F: FnMut(Vec<LogEntry>),
{
    let mut summary = MergeSummary::default();
    let mut cursors = Vec::new();

    // Discovery order doubles as the stable tie-break key, so open in order.
    for path in paths {
        let file_label = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        let rule = rules.iter().find(|r| r.applies_to(&file_label)).cloned();
        match SourceCursor::open(path, rule) {
            Ok(cursor) => cursors.push(ActiveCursor {
                cursor,
                buffer: VecDeque::new(),
                exhausted: false,
            }),
            Err(e) => {
                warn!(file = %file_label, error = %e, "excluding source that failed to open");
                summary.excluded_sources.push(file_label);
            }
        }
    }

    let mut session = Session {
        cursors,
        batch_size: options.batch_size.max(1),
        seq: 0,
        summary,
        on_batch: &mut on_batch,
    };

    if options.warmup {
        session.warmup_phase(options.warmup_per_type_limit, cancel).await;
    }
    if !session.summary.cancelled {
        session.full_merge(cancel).await;
    }

    // Cursors (and their file handles) drop here on every path.
    Ok(session.summary)
}

struct Session<'a, F: FnMut(Vec<LogEntry>)> {
    cursors: Vec<ActiveCursor>,
    batch_size: usize,
    seq: u64,
    summary: MergeSummary,
    on_batch: &'a mut F,
}

impl<F: FnMut(Vec<LogEntry>)> Session<'_, F> {
    /// Peek cursor `idx`, demoting it to excluded on a read error.
    fn peek(&mut self, idx: usize) -> Option<&LogEntry> {
        let fetch = self.batch_size;
        if let Err(e) = self.cursors[idx].fill(fetch) {
            let active = &mut self.cursors[idx];
            warn!(
                file = %active.cursor.file_name(),
                error = %e,
                "excluding source after read error"
            );
            active.exhausted = true;
            active.buffer.clear();
            let label = active.cursor.file_name().to_string();
            self.summary.excluded_sources.push(label);
            return None;
        }
        self.cursors[idx].buffer.front()
    }

    fn emit(&mut self, mut batch: Vec<LogEntry>) {
        for entry in &mut batch {
            entry.id = self.seq;
            self.seq += 1;
        }
        self.summary.entries += batch.len() as u64;
        self.summary.batches += 1;
        (self.on_batch)(batch);
    }

    /// True k-way merge: repeatedly select the greatest corrected timestamp
    /// among cursor heads (output is newest-first), tie-break by discovery
    /// order. Cancellation is honored between batches only.
    async fn full_merge(&mut self, cancel: &CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                debug!("merge cancelled between batches");
                self.summary.cancelled = true;
                return;
            }

            let mut batch = Vec::with_capacity(self.batch_size);
            while batch.len() < self.batch_size {
                let mut best: Option<(usize, i64)> = None;
                for idx in 0..self.cursors.len() {
                    if let Some(head) = self.peek(idx) {
                        let ts = head.ts;
                        // Strictly greater keeps the earliest-discovered
                        // source first on equal timestamps.
                        if best.map_or(true, |(_, best_ts)| ts > best_ts) {
                            best = Some((idx, ts));
                        }
                    }
                }
                let Some((idx, _)) = best else { break };
                if let Some(entry) = self.cursors[idx].pop() {
                    batch.push(entry);
                }
            }

            if batch.is_empty() {
                return;
            }
            self.emit(batch);
            tokio::task::yield_now().await;
        }
    }

    /// Warmup preview: up to `limit` most-recent entries per distinct source
    /// kind, round-robin across that kind's sources in per-cursor order.
    /// Entries consumed here are excluded from the follow-up full merge.
    async fn warmup_phase(&mut self, limit: usize, cancel: &CancellationToken) {
        if cancel.is_cancelled() {
            self.summary.cancelled = true;
            return;
        }

        // Kind groups in discovery order of their first member.
        let mut kinds: Vec<SourceKind> = Vec::new();
        for active in &self.cursors {
            let kind = active.cursor.kind();
            if !kinds.contains(&kind) {
                kinds.push(kind);
            }
        }

        let mut preview = Vec::new();
        for kind in kinds {
            let members: Vec<usize> = (0..self.cursors.len())
                .filter(|&i| self.cursors[i].cursor.kind() == kind)
                .collect();
            let mut taken = 0;
            while taken < limit {
                let mut progressed = false;
                for &idx in &members {
                    if taken >= limit {
                        break;
                    }
                    if self.peek(idx).is_some() {
                        if let Some(entry) = self.cursors[idx].pop() {
                            preview.push(entry);
                            taken += 1;
                            progressed = true;
                        }
                    }
                }
                if !progressed {
                    break;
                }
            }
        }

        let chunk = self.batch_size;
        let mut remaining = preview;
        while !remaining.is_empty() {
            if cancel.is_cancelled() {
                debug!("warmup cancelled between batches");
                self.summary.cancelled = true;
                return;
            }
            let rest = remaining.split_off(remaining.len().min(chunk));
            self.emit(remaining);
            remaining = rest;
            tokio::task::yield_now().await;
        }
    }
}

/// Scan a directory for recognized log sources: `*.log` and `*.jsonl`,
/// sorted by file name for deterministic discovery order.
pub fn discover_sources(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| {
            p.extension()
                .map_or(false, |ext| ext == "log" || ext == "jsonl")
        })
        .collect();
    files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(files)
}
