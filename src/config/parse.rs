use std::path::Path;
use thiserror::Error;

use crate::config::types::RulesConfig;
use crate::source::fields::{FieldRules, RuleError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config file: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid field rule: {0}")]
    Rule(#[from] RuleError),
}

/// Load a rules file without compiling its patterns.
pub fn load_rules(path: &Path) -> Result<RulesConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let config: RulesConfig = serde_yaml::from_str(&contents)?;
    Ok(config)
}

/// Load a rules file and compile every rule set.
///
/// Malformed regex or glob patterns surface here, at load time, rather than
/// as per-line failures later.
pub fn load_compiled_rules(path: &Path) -> Result<Vec<FieldRules>, ConfigError> {
    let config = load_rules(path)?;
    compile_rules(&config)
}

pub fn compile_rules(config: &RulesConfig) -> Result<Vec<FieldRules>, ConfigError> {
    config
        .rules
        .iter()
        .map(|rule| FieldRules::compile(rule).map_err(ConfigError::from))
        .collect()
}
