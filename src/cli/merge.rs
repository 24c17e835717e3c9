use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::{load_compiled_rules, resolve_rules_path, ConfigError};
use crate::merge::{merge_directory, MergeError, MergeOptions};

#[derive(Debug, Error)]
pub enum MergeCliError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("merge error: {0}")]
    Merge(#[from] MergeError),
}

/// Merge a directory of log files and print each entry as one JSON object
/// per line.
pub async fn run(
    dir: PathBuf,
    rules_path: Option<PathBuf>,
    options: MergeOptions,
) -> Result<(), MergeCliError> {
    let rules = match resolve_rules_path(rules_path.as_deref()) {
        Some(path) => {
            info!(path = %path.display(), "loading field rules");
            load_compiled_rules(&path)?
                .into_iter()
                .map(Arc::new)
                .collect()
        }
        None => Vec::new(),
    };

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_cancel.cancel();
        }
    });

    let stdout = std::io::stdout();
    let write_cancel = cancel.clone();
    let summary = merge_directory(&dir, &rules, &options, &cancel, |batch| {
        let mut out = stdout.lock();
        for entry in &batch {
            let ok = serde_json::to_writer(&mut out, entry).is_ok() && writeln!(out).is_ok();
            if !ok {
                // Downstream hung up; stop at the next cancellation check.
                write_cancel.cancel();
                return;
            }
        }
    })
    .await?;

    for source in &summary.excluded_sources {
        warn!(source = %source, "source was excluded from the merge");
    }
    info!(
        entries = summary.entries,
        batches = summary.batches,
        cancelled = summary.cancelled,
        "merge complete"
    );

    Ok(())
}
