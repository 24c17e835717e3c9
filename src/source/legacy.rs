use serde::Deserialize;
use std::path::{Path, PathBuf};

/// A pre-merged JSONL record as written by older format versions.
///
/// Every field except `ts` and `text` may be missing; in particular old
/// exports omit `file`, which newer consumers require. Presence is modeled
/// explicitly rather than coalesced away.
#[derive(Debug, Clone, Deserialize)]
pub struct LegacyRecord {
    pub ts: Option<i64>,
    pub text: Option<String>,
    pub file: Option<String>,
    pub source: Option<String>,
    pub path: Option<String>,
    pub level: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}

impl LegacyRecord {
    /// Derive the output `file` label for this record.
    ///
    /// Resolution order: an explicit non-empty `file`, then `source` taken
    /// verbatim as the file label, then the final segment of `path`. A record
    /// with none of these resolves to the empty string and callers must
    /// tolerate it.
    pub fn resolved_file(&self) -> String {
        if let Some(file) = self.file.as_deref() {
            if !file.is_empty() {
                return file.to_string();
            }
        }
        if let Some(source) = self.source.as_deref() {
            if !source.is_empty() {
                return source.to_string();
            }
        }
        if let Some(path) = self.path.as_deref() {
            if let Some(name) = Path::new(path).file_name() {
                return name.to_string_lossy().into_owned();
            }
        }
        String::new()
    }
}

/// Scan a directory for legacy merged JSONL files.
///
/// Pure filesystem-pattern scan: suffix match on the merged-records naming
/// convention (`.jsonl`). Results are sorted by file name so discovery order
/// is deterministic.
pub fn discover_merged_files(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().map_or(false, |ext| ext == "jsonl"))
        .collect();
    files.sort_by_key(|p| p.file_name().map(|n| n.to_os_string()));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: &str) -> LegacyRecord {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_explicit_file_wins() {
        let r = record(r#"{"ts":1,"text":"a","file":"x.log","source":"y.log"}"#);
        assert_eq!(r.resolved_file(), "x.log");
    }

    #[test]
    fn test_source_used_verbatim() {
        let r = record(r#"{"ts":1,"text":"a","source":"kernel.log"}"#);
        assert_eq!(r.resolved_file(), "kernel.log");
    }

    #[test]
    fn test_path_basename() {
        let r = record(r#"{"ts":2,"text":"b","path":"/tmp/x/cpcd.log"}"#);
        assert_eq!(r.resolved_file(), "cpcd.log");
    }

    #[test]
    fn test_empty_file_falls_through_to_source() {
        let r = record(r#"{"ts":1,"text":"a","file":"","source":"misc.log"}"#);
        assert_eq!(r.resolved_file(), "misc.log");
    }

    #[test]
    fn test_no_identity_fields_resolves_empty() {
        let r = record(r#"{"ts":1,"text":"a"}"#);
        assert_eq!(r.resolved_file(), "");
    }

    #[test]
    fn test_discover_merged_files_sorted() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("misc.jsonl"), "").unwrap();
        std::fs::write(dir.path().join("kernel.jsonl"), "").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "").unwrap();

        let files = discover_merged_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["kernel.jsonl", "misc.jsonl"]);
    }

    #[test]
    fn test_discover_missing_dir_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(discover_merged_files(&missing).is_err());
    }
}
