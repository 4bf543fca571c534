//! Tally CLI entry point.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tally::{AnalyticsStore, Config, LlmSynthesizer, QueryPipeline};

/// Tally: natural-language analytics over video-content metrics
#[derive(Parser, Debug)]
#[command(name = "tally")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Ask a natural-language analytics question
    Ask {
        /// Question text
        question: String,
    },
    /// Bulk-load a JSON metrics export into the analytics store
    Load {
        /// Path to the export file
        path: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::load()?,
    };

    match args.command {
        Command::Ask { question } => {
            let store = AnalyticsStore::open(config.database_path())?;
            let synthesizer = LlmSynthesizer::from_config(&config.synthesis)?;
            let pipeline = QueryPipeline::new(Arc::new(synthesizer), Arc::new(store));
            println!("{}", pipeline.process(&question).await);
        }
        Command::Load { path } => {
            let store = AnalyticsStore::open(config.database_path())?;
            let report = store.load_json(&path)?;
            println!("Loaded {} videos, {} snapshots", report.videos, report.snapshots);
        }
    }

    Ok(())
}
