use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::entry::{LogEntry, LogLevel, SourceKind};
use crate::source::corrector::TzCorrector;
use crate::source::fields::FieldRules;
use crate::source::legacy::LegacyRecord;
use crate::source::timestamp::{extract_timestamp, infer_level};

#[derive(Debug, Error)]
pub enum CursorError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("source path has no file name: {0}")]
    InvalidPath(PathBuf),
}

/// How the underlying file is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFormat {
    /// Raw text log, one entry per line.
    Plain,
    /// Legacy merged JSONL, one record per line.
    LegacyJsonl,
}

/// Incremental reader over one physical log or merged JSONL file.
///
/// Owns exactly one open file handle, the read offset, and a private
/// [`TzCorrector`]. Repeated [`next_batch`](Self::next_batch) calls resume
/// where the previous call left off; an empty batch is the exhaustion signal,
/// at which point the handle is released. Individual undecodable lines are
/// skipped, not fatal.
///
/// A cursor is not safe for concurrent `next_batch` calls; the merge
/// scheduler serializes access.
pub struct SourceCursor {
    file_name: String,
    source: String,
    kind: SourceKind,
    format: SourceFormat,
    reader: Option<BufReader<File>>,
    offset: u64,
    corrector: TzCorrector,
    rules: Option<Arc<FieldRules>>,
}

impl SourceCursor {
    /// Open a cursor over the given file.
    ///
    /// Format is detected from the extension: `.jsonl` files are decoded
    /// through the legacy shim, everything else as plain text.
    pub fn open(path: &Path, rules: Option<Arc<FieldRules>>) -> Result<Self, CursorError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| CursorError::InvalidPath(path.to_path_buf()))?;
        let source = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.clone());
        let format = if path.extension().map_or(false, |ext| ext == "jsonl") {
            SourceFormat::LegacyJsonl
        } else {
            SourceFormat::Plain
        };

        let file = File::open(path)?;

        Ok(Self {
            kind: SourceKind::classify(&source),
            file_name,
            source,
            format,
            reader: Some(BufReader::new(file)),
            offset: 0,
            corrector: TzCorrector::new(),
            rules,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Coarse category classified from the source label. Legacy records may
    /// override it per entry.
    pub fn kind(&self) -> SourceKind {
        self.kind
    }

    /// Byte offset of the next unread line.
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Produce the next batch of at most `n` entries.
    ///
    /// Entry `id` is left as 0; the merge scheduler assigns the session
    /// sequence number at emission time. Returns an empty batch once the file
    /// is exhausted.
    pub fn next_batch(&mut self, n: usize) -> Result<Vec<LogEntry>, CursorError> {
        let mut out = Vec::new();

        while out.len() < n {
            let mut line = String::new();
            let bytes_read = match self.reader.as_mut() {
                None => break,
                Some(reader) => reader.read_line(&mut line)?,
            };
            if bytes_read == 0 {
                // Exhausted: release the handle.
                self.reader = None;
                break;
            }
            self.offset += bytes_read as u64;

            let line = line.trim_end_matches(&['\n', '\r'][..]);
            if line.is_empty() {
                continue;
            }

            let decoded = match self.format {
                SourceFormat::Plain => self.decode_plain(line),
                SourceFormat::LegacyJsonl => self.decode_legacy(line),
            };
            match decoded {
                Some(entry) => out.push(entry),
                None => {
                    debug!(file = %self.file_name, "skipping undecodable line");
                }
            }
        }

        Ok(out)
    }

    fn decode_plain(&mut self, line: &str) -> Option<LogEntry> {
        // A configured time pattern takes precedence over the generic
        // extractor; its captured fragment still goes through the extractor
        // to become epoch milliseconds.
        let raw_ts = self
            .rules
            .as_ref()
            .and_then(|r| r.extract(line).time)
            .and_then(|t| extract_timestamp(&t))
            .or_else(|| extract_timestamp(line))?;

        Some(LogEntry {
            id: 0,
            ts: self.corrector.correct(raw_ts),
            level: infer_level(line),
            kind: self.kind,
            source: self.source.clone(),
            file: self.file_name.clone(),
            text: line.to_string(),
        })
    }

    fn decode_legacy(&mut self, line: &str) -> Option<LogEntry> {
        let record: LegacyRecord = serde_json::from_str(line).ok()?;

        let text = record.text.clone().unwrap_or_default();
        let raw_ts = record.ts.or_else(|| extract_timestamp(&text))?;

        let mut file = record.resolved_file();
        if file.is_empty() {
            // Record carried no identity at all: fall back to the container
            // file so emitted output never has an empty `file`.
            file = self.file_name.clone();
        }
        let source = Path::new(&file)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source.clone());

        let level = record
            .level
            .as_deref()
            .and_then(LogLevel::parse)
            .unwrap_or_else(|| infer_level(&text));
        let kind = record
            .kind
            .as_deref()
            .and_then(SourceKind::parse)
            .unwrap_or_else(|| SourceKind::classify(&source));

        Some(LogEntry {
            id: 0,
            ts: self.corrector.correct(raw_ts),
            level,
            kind,
            source,
            file,
            text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn plain_file(lines: &[&str]) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".log").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    fn jsonl_file(lines: &[&str]) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".jsonl")
            .tempfile()
            .unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_batch_round_trip() {
        // N + k entries: next_batch(N) yields N, then k, then empty.
        let file = plain_file(&[
            "2025-06-01T10:00:04Z line a",
            "2025-06-01T10:00:03Z line b",
            "2025-06-01T10:00:02Z line c",
            "2025-06-01T10:00:01Z line d",
            "2025-06-01T10:00:00Z line e",
        ]);
        let mut cursor = SourceCursor::open(file.path(), None).unwrap();

        assert_eq!(cursor.offset(), 0);
        assert_eq!(cursor.next_batch(3).unwrap().len(), 3);
        let mid = cursor.offset();
        assert!(mid > 0);
        assert_eq!(cursor.next_batch(3).unwrap().len(), 2);
        assert!(cursor.next_batch(3).unwrap().is_empty());
        // Still empty on further calls, not an error.
        assert!(cursor.next_batch(3).unwrap().is_empty());
        // Every consumed byte is accounted for.
        assert!(cursor.offset() > mid);
        assert_eq!(cursor.offset(), file.path().metadata().unwrap().len());
    }

    #[test]
    fn test_plain_entries_carry_source_and_file() {
        let file = plain_file(&["2025-06-01T10:00:00Z ERROR boom"]);
        let mut cursor = SourceCursor::open(file.path(), None).unwrap();
        let batch = cursor.next_batch(10).unwrap();
        assert_eq!(batch.len(), 1);
        let entry = &batch[0];
        assert_eq!(entry.file, cursor.file_name());
        assert_eq!(entry.source, cursor.source());
        assert_eq!(entry.level, LogLevel::Error);
        assert_eq!(entry.text, "2025-06-01T10:00:00Z ERROR boom");
        assert_eq!(entry.id, 0);
    }

    #[test]
    fn test_lines_without_timestamp_are_skipped() {
        let file = plain_file(&[
            "2025-06-01T10:00:01Z keep me",
            "no timestamp at all",
            "2025-06-01T10:00:00Z keep me too",
        ]);
        let mut cursor = SourceCursor::open(file.path(), None).unwrap();
        let batch = cursor.next_batch(10).unwrap();
        assert_eq!(batch.len(), 2);
        assert!(batch[0].text.ends_with("keep me"));
        assert!(batch[1].text.ends_with("keep me too"));
    }

    #[test]
    fn test_corrected_timestamps_non_increasing() {
        // Mid-file timezone jump: raw timestamps move forward 9h.
        let file = plain_file(&[
            "2025-06-01T10:00:00Z a",
            "2025-06-01T09:59:00Z b",
            "2025-06-01T18:58:00Z c",
            "2025-06-01T18:57:00Z d",
        ]);
        let mut cursor = SourceCursor::open(file.path(), None).unwrap();
        let batch = cursor.next_batch(10).unwrap();
        assert_eq!(batch.len(), 4);
        for pair in batch.windows(2) {
            assert!(pair[1].ts <= pair[0].ts);
        }
    }

    #[test]
    fn test_legacy_source_field_becomes_file() {
        let file = jsonl_file(&[r#"{"ts":1,"text":"a","source":"kernel.log"}"#]);
        let mut cursor = SourceCursor::open(file.path(), None).unwrap();
        let batch = cursor.next_batch(10).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].file, "kernel.log");
        assert_eq!(batch[0].source, "kernel");
        assert_eq!(batch[0].kind, SourceKind::Kernel);
        assert_eq!(batch[0].ts, 1);
    }

    #[test]
    fn test_legacy_path_field_becomes_file_basename() {
        let file = jsonl_file(&[r#"{"ts":2,"text":"b","path":"/tmp/x/cpcd.log"}"#]);
        let mut cursor = SourceCursor::open(file.path(), None).unwrap();
        let batch = cursor.next_batch(10).unwrap();
        assert_eq!(batch[0].file, "cpcd.log");
    }

    #[test]
    fn test_legacy_without_identity_uses_container_file() {
        let file = jsonl_file(&[r#"{"ts":3,"text":"c"}"#]);
        let mut cursor = SourceCursor::open(file.path(), None).unwrap();
        let batch = cursor.next_batch(10).unwrap();
        assert_eq!(batch[0].file, cursor.file_name());
        assert!(!batch[0].file.is_empty());
    }

    #[test]
    fn test_legacy_malformed_json_skipped() {
        let file = jsonl_file(&[
            r#"{"ts":5,"text":"good","source":"misc.log"}"#,
            "{not json",
            r#"{"ts":4,"text":"also good","source":"misc.log"}"#,
        ]);
        let mut cursor = SourceCursor::open(file.path(), None).unwrap();
        let batch = cursor.next_batch(10).unwrap();
        assert_eq!(batch.len(), 2);
    }

    #[test]
    fn test_legacy_level_and_kind_respected() {
        let file = jsonl_file(&[
            r#"{"ts":9,"text":"x","source":"misc.log","level":"warn","type":"system"}"#,
        ]);
        let mut cursor = SourceCursor::open(file.path(), None).unwrap();
        let batch = cursor.next_batch(10).unwrap();
        assert_eq!(batch[0].level, LogLevel::Warn);
        assert_eq!(batch[0].kind, SourceKind::System);
    }

    #[test]
    fn test_rules_time_pattern_takes_precedence() {
        use crate::config::types::{FieldPatterns, FieldRuleConfig};

        // The generic extractor would grab the leading decoy timestamp; the
        // rule isolates the bracketed one.
        let file = plain_file(&["2024-01-01T00:00:00Z [2025-06-01T10:00:00Z] payload"]);
        let rules = FieldRules::compile(&FieldRuleConfig {
            files: vec![],
            regex: FieldPatterns {
                time: Some(r"\[(?P<t>[^\]]+)\]".to_string()),
                ..Default::default()
            },
        })
        .unwrap();
        let mut cursor = SourceCursor::open(file.path(), Some(Arc::new(rules))).unwrap();
        let batch = cursor.next_batch(10).unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(
            batch[0].ts,
            chrono::DateTime::parse_from_rfc3339("2025-06-01T10:00:00Z")
                .unwrap()
                .timestamp_millis()
        );
    }

    #[test]
    fn test_open_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let result = SourceCursor::open(&dir.path().join("missing.log"), None);
        assert!(matches!(result, Err(CursorError::Io(_))));
    }
}
