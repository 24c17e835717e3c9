use serde::{Deserialize, Serialize};

/// Root of the rules file: a list of field-extraction rule sets.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesConfig {
    #[serde(default)]
    pub rules: Vec<FieldRuleConfig>,
}

/// One user-authored field-extraction rule set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldRuleConfig {
    /// Glob allowlist of file names this rule set applies to. Empty means
    /// every file.
    #[serde(default)]
    pub files: Vec<String>,
    pub regex: FieldPatterns,
}

/// Per-field regular expressions, each optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldPatterns {
    pub time: Option<String>,
    pub process: Option<String>,
    pub pid: Option<String>,
    pub message: Option<String>,
}
