use regex::Regex;
use thiserror::Error;

use crate::config::types::FieldRuleConfig;

/// Error type for field-rule compilation. Surfaced at rule-load time, never
/// deferred to per-line extraction.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("regex compilation error for field '{field}' pattern '{pattern}': {source}")]
    Regex {
        field: &'static str,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid file glob '{pattern}': {source}")]
    Glob {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// One compiled per-field pattern.
///
/// Extraction returns the value of the first named capture group in pattern
/// declaration order, mirroring how operators author ad hoc single-capture
/// patterns. A pattern with no named groups yields the overall match text.
#[derive(Debug)]
struct CompiledField {
    regex: Regex,
    group: Option<String>,
}

impl CompiledField {
    fn compile(field: &'static str, pattern: &str) -> Result<Self, RuleError> {
        let regex = Regex::new(pattern).map_err(|source| RuleError::Regex {
            field,
            pattern: pattern.to_string(),
            source,
        })?;
        // capture_names() yields groups in declaration order; the first
        // named one wins regardless of what it is called.
        let group = regex
            .capture_names()
            .flatten()
            .next()
            .map(|name| name.to_string());
        Ok(Self { regex, group })
    }

    fn extract(&self, line: &str) -> Option<String> {
        let caps = self.regex.captures(line)?;
        match &self.group {
            Some(name) => caps.name(name).map(|m| m.as_str().to_string()),
            None => Some(caps.get(0)?.as_str().to_string()),
        }
    }
}

/// Fields pulled out of one line by a [`FieldRules`] instance.
#[derive(Debug, Default, PartialEq)]
pub struct ExtractedFields {
    pub time: Option<String>,
    pub process: Option<String>,
    pub pid: Option<String>,
    pub message: Option<String>,
}

/// A compiled per-field rule set with a file-name glob allowlist.
#[derive(Debug)]
pub struct FieldRules {
    files: Vec<Regex>,
    time: Option<CompiledField>,
    process: Option<CompiledField>,
    pid: Option<CompiledField>,
    message: Option<CompiledField>,
}

impl FieldRules {
    pub fn compile(config: &FieldRuleConfig) -> Result<Self, RuleError> {
        let files = config
            .files
            .iter()
            .map(|glob| compile_glob(glob))
            .collect::<Result<Vec<_>, _>>()?;

        let compile = |field, pattern: &Option<String>| -> Result<Option<CompiledField>, RuleError> {
            pattern
                .as_deref()
                .map(|p| CompiledField::compile(field, p))
                .transpose()
        };

        Ok(Self {
            files,
            time: compile("time", &config.regex.time)?,
            process: compile("process", &config.regex.process)?,
            pid: compile("pid", &config.regex.pid)?,
            message: compile("message", &config.regex.message)?,
        })
    }

    /// Whether this rule set applies to the given file name. An empty
    /// allowlist matches every file.
    pub fn applies_to(&self, file_name: &str) -> bool {
        self.files.is_empty() || self.files.iter().any(|g| g.is_match(file_name))
    }

    /// Apply each configured field pattern to the line. Non-match or absent
    /// pattern yields an absent field, never an error.
    pub fn extract(&self, line: &str) -> ExtractedFields {
        let apply = |field: &Option<CompiledField>| field.as_ref().and_then(|f| f.extract(line));
        ExtractedFields {
            time: apply(&self.time),
            process: apply(&self.process),
            pid: apply(&self.pid),
            message: apply(&self.message),
        }
    }
}

/// Translate a `*`/`?` glob into an anchored regex.
fn compile_glob(glob: &str) -> Result<Regex, RuleError> {
    let mut pattern = String::with_capacity(glob.len() + 8);
    pattern.push('^');
    for c in glob.chars() {
        match c {
            '*' => pattern.push_str(".*"),
            '?' => pattern.push('.'),
            c => pattern.push_str(&regex::escape(&c.to_string())),
        }
    }
    pattern.push('$');
    Regex::new(&pattern).map_err(|source| RuleError::Glob {
        pattern: glob.to_string(),
        source,
    })
}
