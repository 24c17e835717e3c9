pub mod parse;
pub mod types;

use std::path::{Path, PathBuf};

pub use parse::{compile_rules, load_compiled_rules, load_rules, ConfigError};
pub use types::{FieldPatterns, FieldRuleConfig, RulesConfig};

/// Resolves the rules file path based on explicit argument or default locations.
/// Returns the first existing path from:
/// 1. Explicit path (if provided)
/// 2. ~/.config/logloom/rules.yml
/// 3. /etc/logloom/rules.yml
pub fn resolve_rules_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Some(home_dir) = dirs::home_dir() {
        let user_config = home_dir.join(".config/logloom/rules.yml");
        if user_config.exists() {
            return Some(user_config);
        }
    }

    let system_config = PathBuf::from("/etc/logloom/rules.yml");
    if system_config.exists() {
        return Some(system_config);
    }

    None
}
