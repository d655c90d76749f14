mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser)]
#[command(name = "billtracker")]
#[command(about = "Sync and summarize state legislation from LegiScan")]
struct Cli {
    /// Output format: table or json
    #[arg(long, default_value = "table", global = true)]
    output: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync a state's current session into SQLite
    Sync(commands::sync::SyncArgs),
    /// List a state's legislative sessions
    Sessions(commands::sessions::SessionsArgs),
    /// List stored bills for a state
    Bills(commands::bills::BillsArgs),
    /// Show recent sync jobs
    Jobs(commands::jobs::JobsArgs),
    /// Show this month's LegiScan query usage
    Usage(commands::usage::UsageArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("billtracker=info".parse()?),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    let format = match cli.output.as_str() {
        "json" => OutputFormat::Json,
        _ => OutputFormat::Table,
    };

    match &cli.command {
        Commands::Sync(args) => commands::sync::run(args, &format).await?,
        Commands::Sessions(args) => commands::sessions::run(args, &format).await?,
        Commands::Bills(args) => commands::bills::run(args, &format)?,
        Commands::Jobs(args) => commands::jobs::run(args, &format)?,
        Commands::Usage(args) => commands::usage::run(args, &format)?,
    }

    Ok(())
}
