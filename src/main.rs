use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use logloom::merge::MergeOptions;
use logloom::search::SearchQuery;

#[derive(Parser)]
#[command(name = "logloom")]
#[command(about = "Merges device log files into one chronological stream", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Merge all recognized log files in a directory, newest first, to stdout
    Merge {
        dir: PathBuf,

        /// Field-extraction rules file (YAML)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Entries per emitted batch
        #[arg(long, default_value_t = 500)]
        batch_size: usize,

        /// Deliver a bounded per-type preview before the full merge
        #[arg(long)]
        warmup: bool,

        /// Preview entries per source type (warmup mode)
        #[arg(long, default_value_t = 20)]
        warmup_limit: usize,
    },
    /// Filter a merged JSONL file
    Search {
        file: PathBuf,

        /// Text predicate, case-insensitive
        #[arg(short)]
        q: Option<String>,

        /// Treat the text predicate as a regular expression
        #[arg(long)]
        regex: bool,

        /// Inclusive lower timestamp bound (epoch ms)
        #[arg(long)]
        from: Option<i64>,

        /// Inclusive upper timestamp bound (epoch ms)
        #[arg(long)]
        to: Option<i64>,

        /// Keep only the first N matches
        #[arg(long)]
        top: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "logloom=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Merge {
            dir,
            rules,
            batch_size,
            warmup,
            warmup_limit,
        } => {
            let options = MergeOptions {
                warmup,
                warmup_per_type_limit: warmup_limit,
                batch_size,
            };
            logloom::cli::merge::run(dir, rules, options).await?;
        }
        Commands::Search {
            file,
            q,
            regex,
            from,
            to,
            top,
        } => {
            let query = SearchQuery {
                q,
                regex,
                from,
                to,
                top,
            };
            logloom::cli::search::run(file, query)?;
        }
    }

    Ok(())
}
