use serde::{Deserialize, Serialize};

/// A single merged log entry.
///
/// Entries are produced by a [`SourceCursor`](crate::source::cursor::SourceCursor)
/// and sequenced by the merge scheduler, which assigns `id` at emission time.
/// `ts` is the corrected epoch-millisecond timestamp; within one source the
/// corrected timestamps are non-increasing in delivery order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Emission sequence number, unique and increasing within a merge session.
    #[serde(default)]
    pub id: u64,
    /// Corrected epoch-millisecond timestamp.
    pub ts: i64,
    pub level: LogLevel,
    /// Coarse source category, used for warmup per-kind limiting.
    #[serde(rename = "type")]
    pub kind: SourceKind,
    /// Logical source label (file stem, e.g. `kernel`).
    pub source: String,
    /// Original file name the entry was read from. Never empty in emitted
    /// output when the input carried any of `file`/`source`/`path`.
    pub file: String,
    /// Raw line content.
    pub text: String,
}

/// Log severity, inferred from the line when the record carries none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warn => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl LogLevel {
    /// Parse a level string from a legacy record, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" | "trace" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" | "warning" => Some(LogLevel::Warn),
            "error" | "fatal" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Coarse category of a log source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    System,
    Kernel,
    Application,
    Other,
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceKind::System => write!(f, "system"),
            SourceKind::Kernel => write!(f, "kernel"),
            SourceKind::Application => write!(f, "application"),
            SourceKind::Other => write!(f, "other"),
        }
    }
}

impl SourceKind {
    /// Parse a kind string from a legacy record, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "system" => Some(SourceKind::System),
            "kernel" => Some(SourceKind::Kernel),
            "application" | "app" => Some(SourceKind::Application),
            "other" => Some(SourceKind::Other),
            _ => None,
        }
    }

    /// Classify a source label (file stem) into a coarse category.
    pub fn classify(source: &str) -> Self {
        let s = source.to_ascii_lowercase();
        if s.contains("kernel") || s.contains("kmsg") || s.contains("dmesg") {
            SourceKind::Kernel
        } else if s.contains("system")
            || s.contains("syslog")
            || s.contains("messages")
            || s.contains("daemon")
        {
            SourceKind::System
        } else if s.is_empty() {
            SourceKind::Other
        } else {
            SourceKind::Application
        }
    }
}
