//! The `sync` subcommand: pull a state's changed bills into SQLite.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use billtracker_lib::summarize::DEFAULT_GEMINI_MODEL;
use billtracker_lib::{
    CachedClient, ClientConfig, Db, GeminiSummarizer, IngestOptions, IngestionAdapter,
    OfflineSummarizer, Summarizer, SyncEngine, SyncOptions,
};
use clap::Args;

use crate::output::{print_json, print_sync_table, OutputFormat};

#[derive(Args)]
pub struct SyncArgs {
    /// Two-letter state code (e.g. CA)
    #[arg(long)]
    pub state: String,

    /// Maximum bills to refresh, most recently active first
    #[arg(long, default_value = "25")]
    pub limit: usize,

    /// SQLite database path
    #[arg(long, env = "BILLTRACKER_DB", default_value = "billtracker.db")]
    pub db: PathBuf,

    /// Delay between bill fetches in milliseconds
    #[arg(long, default_value = "150")]
    pub delay_ms: u64,

    /// Store bills without generating AI summaries
    #[arg(long)]
    pub no_summaries: bool,
}

fn build_summarizer() -> Result<Box<dyn Summarizer>> {
    match std::env::var("GEMINI_API_KEY") {
        Ok(key) if !key.trim().is_empty() => {
            let model =
                std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_GEMINI_MODEL.to_string());
            Ok(Box::new(GeminiSummarizer::new(&key)?.with_model(model)))
        }
        _ => {
            eprintln!("GEMINI_API_KEY not set; storing placeholder summaries");
            Ok(Box::new(OfflineSummarizer))
        }
    }
}

pub async fn run(args: &SyncArgs, format: &OutputFormat) -> Result<()> {
    let config = ClientConfig::from_env()?;
    let client = CachedClient::from_config(&config)?;
    let engine = SyncEngine::new(client);

    let db = Db::open(&args.db)?;
    db.init()?;

    let summarizer = build_summarizer()?;
    let adapter = IngestionAdapter::new(&engine, &db, &*summarizer);

    let options = IngestOptions {
        sync: SyncOptions {
            limit: args.limit,
            bill_delay: Duration::from_millis(args.delay_ms),
        },
        summarize: !args.no_summaries,
        bill_delay: Duration::ZERO,
        monthly_limit: Some(config.monthly_limit),
    };

    eprintln!("Starting sync for {} into {}", args.state, args.db.display());
    let outcome = adapter.run(&args.state, &options).await?;

    match format {
        OutputFormat::Table => {
            print_sync_table(&outcome);
            for err in &outcome.errors {
                eprintln!("  - {}", err);
            }
            if !outcome.changed && outcome.errors.is_empty() {
                eprintln!("No changes since last sync");
            }
            eprintln!("Cache: {}", engine.client().cache_stats());
        }
        OutputFormat::Json => print_json(&outcome),
    }

    Ok(())
}
