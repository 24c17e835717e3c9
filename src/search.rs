use regex::RegexBuilder;
use serde::Deserialize;
use thiserror::Error;

use crate::entry::LogEntry;

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("invalid search pattern '{pattern}': {source}")]
    Regex {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Query predicates applied over an in-memory entry collection.
///
/// Filters compose as logical AND; the `top` cap is applied after filtering
/// and keeps the first matches in input order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    /// Text predicate: case-insensitive substring, or case-insensitive regex
    /// when `regex` is true.
    pub q: Option<String>,
    #[serde(default)]
    pub regex: bool,
    /// Inclusive lower timestamp bound (epoch ms).
    pub from: Option<i64>,
    /// Inclusive upper timestamp bound (epoch ms).
    pub to: Option<i64>,
    pub top: Option<usize>,
}

/// Filter `entries` by `query`, returning matches in input order.
///
/// Pure and synchronous; no entry is mutated. A malformed regex pattern is
/// the only error.
pub fn search(entries: &[LogEntry], query: &SearchQuery) -> Result<Vec<LogEntry>, SearchError> {
    enum TextMatcher {
        None,
        Substring(String),
        Regex(regex::Regex),
    }

    let matcher = match &query.q {
        None => TextMatcher::None,
        Some(q) if query.regex => {
            let re = RegexBuilder::new(q)
                .case_insensitive(true)
                .build()
                .map_err(|source| SearchError::Regex {
                    pattern: q.clone(),
                    source,
                })?;
            TextMatcher::Regex(re)
        }
        Some(q) => TextMatcher::Substring(q.to_lowercase()),
    };

    let mut result = Vec::new();
    for entry in entries {
        if let Some(top) = query.top {
            if result.len() >= top {
                break;
            }
        }
        if let Some(from) = query.from {
            if entry.ts < from {
                continue;
            }
        }
        if let Some(to) = query.to {
            if entry.ts > to {
                continue;
            }
        }
        let text_ok = match &matcher {
            TextMatcher::None => true,
            TextMatcher::Substring(needle) => entry.text.to_lowercase().contains(needle),
            TextMatcher::Regex(re) => re.is_match(&entry.text),
        };
        if !text_ok {
            continue;
        }
        result.push(entry.clone());
    }

    Ok(result)
}
