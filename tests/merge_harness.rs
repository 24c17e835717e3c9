//! End-to-end tests over real directories: discovery, legacy-shim file
//! labeling, full-merge ordering, and the warmup preview.

use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use logloom::entry::{LogEntry, SourceKind};
use logloom::merge::{merge_directory, MergeOptions};
use logloom::source::cursor::SourceCursor;
use logloom::source::legacy::discover_merged_files;

fn write_file(dir: &TempDir, name: &str, lines: &[&str]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, lines.join("\n") + "\n").unwrap();
    path
}

async fn merge_all(dir: &TempDir, options: &MergeOptions) -> Vec<LogEntry> {
    let mut entries = Vec::new();
    merge_directory(
        dir.path(),
        &[],
        options,
        &CancellationToken::new(),
        |batch| entries.extend(batch),
    )
    .await
    .unwrap();
    entries
}

#[tokio::test]
async fn test_legacy_directory_scenario() {
    // Two legacy exports: one labels entries via `source`, one via `path`.
    let dir = TempDir::new().unwrap();
    let kernel = write_file(
        &dir,
        "kernel.jsonl",
        &[r#"{"ts":1,"text":"a","source":"kernel.log"}"#],
    );
    let misc = write_file(
        &dir,
        "misc.jsonl",
        &[r#"{"ts":2,"text":"b","path":"/tmp/x/cpcd.log"}"#],
    );

    let discovered = discover_merged_files(dir.path()).unwrap();
    assert_eq!(discovered, vec![kernel.clone(), misc.clone()]);

    let mut cursor = SourceCursor::open(&kernel, None).unwrap();
    let batch = cursor.next_batch(10).unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].file, "kernel.log");

    let mut cursor = SourceCursor::open(&misc, None).unwrap();
    let batch = cursor.next_batch(10).unwrap();
    assert_eq!(batch.len(), 1);
    assert_eq!(batch[0].file, "cpcd.log");
}

#[tokio::test]
async fn test_mixed_formats_merge_newest_first() {
    let dir = TempDir::new().unwrap();
    write_file(
        &dir,
        "daemon.log",
        &[
            "2025-06-01T10:00:09Z daemon heartbeat",
            "2025-06-01T10:00:05Z daemon started",
        ],
    );
    write_file(
        &dir,
        "export.jsonl",
        &[
            r#"{"ts":1748772007000,"text":"exported high","source":"old.log"}"#,
            r#"{"ts":1748772003000,"text":"exported low","source":"old.log"}"#,
        ],
    );

    let entries = merge_all(&dir, &MergeOptions::default()).await;
    assert_eq!(entries.len(), 4);
    for pair in entries.windows(2) {
        assert!(pair[1].ts <= pair[0].ts);
    }
    // Every entry carries a non-empty file label regardless of origin.
    assert!(entries.iter().all(|e| !e.file.is_empty()));
    // Ids are the emission order.
    let ids: Vec<u64> = entries.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![0, 1, 2, 3]);
}

#[tokio::test]
async fn test_full_merge_runs_are_identical() {
    let dir = TempDir::new().unwrap();
    write_file(
        &dir,
        "a.log",
        &[
            "2025-06-01T10:00:08Z alpha",
            "2025-06-01T10:00:04Z beta",
            "2025-06-01T10:00:00Z gamma",
        ],
    );
    write_file(
        &dir,
        "b.log",
        &["2025-06-01T10:00:06Z delta", "2025-06-01T10:00:02Z epsilon"],
    );

    let options = MergeOptions {
        batch_size: 2,
        ..Default::default()
    };
    let first = merge_all(&dir, &options).await;
    let second = merge_all(&dir, &options).await;
    assert_eq!(first, second);
    assert_eq!(first.len(), 5);
}

#[tokio::test]
async fn test_warmup_preview_then_full_merge() {
    let dir = TempDir::new().unwrap();
    write_file(
        &dir,
        "app.log",
        &["2025-06-01T10:00:09Z app new", "2025-06-01T10:00:01Z app old"],
    );
    write_file(
        &dir,
        "kernel.log",
        &["2025-06-01T10:00:08Z kern new", "2025-06-01T10:00:02Z kern old"],
    );
    write_file(
        &dir,
        "syslog.log",
        &["2025-06-01T10:00:07Z sys new", "2025-06-01T10:00:03Z sys old"],
    );

    let options = MergeOptions {
        warmup: true,
        warmup_per_type_limit: 1,
        batch_size: 100,
    };

    let mut batches: Vec<Vec<LogEntry>> = Vec::new();
    merge_directory(
        dir.path(),
        &[],
        &options,
        &CancellationToken::new(),
        |batch| batches.push(batch),
    )
    .await
    .unwrap();

    // The early batch holds at most one entry per distinct kind.
    let preview = &batches[0];
    assert_eq!(preview.len(), 3);
    let kinds: std::collections::HashSet<SourceKind> =
        preview.iter().map(|e| e.kind).collect();
    assert_eq!(kinds.len(), 3);

    // Every entry appears exactly once across warmup and the remainder.
    let total: usize = batches.iter().map(|b| b.len()).sum();
    assert_eq!(total, 6);
    let mut texts: Vec<String> = batches
        .iter()
        .flatten()
        .map(|e| e.text.clone())
        .collect();
    texts.sort();
    texts.dedup();
    assert_eq!(texts.len(), 6);
}

#[tokio::test]
async fn test_per_source_monotonicity_survives_timezone_jump() {
    // One source flips from UTC display to KST display mid-file.
    let dir = TempDir::new().unwrap();
    write_file(
        &dir,
        "flippy.log",
        &[
            "2025-06-01T12:00:00Z newest",
            "2025-06-01T11:59:00Z next",
            "2025-06-01T20:58:00Z jumped forward nine hours",
            "2025-06-01T20:57:00Z still in local time",
        ],
    );
    write_file(
        &dir,
        "steady.log",
        &["2025-06-01T11:59:30Z interleaved"],
    );

    let entries = merge_all(&dir, &MergeOptions::default()).await;
    assert_eq!(entries.len(), 5);
    for pair in entries.windows(2) {
        assert!(pair[1].ts <= pair[0].ts, "global order broken");
    }
    // The flipped section was pulled back instead of dominating the stream.
    assert_eq!(entries[0].text, "2025-06-01T12:00:00Z newest");
}
