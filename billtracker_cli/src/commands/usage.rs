//! The `usage` subcommand: monthly LegiScan query consumption.

use std::path::PathBuf;

use anyhow::Result;
use billtracker_lib::config::monthly_limit_from_env;
use billtracker_lib::db::month_key;
use billtracker_lib::{Db, QuotaUsage, Storage};
use chrono::Utc;
use clap::Args;

use crate::output::{print_json, print_usage_table, OutputFormat};

#[derive(Args)]
pub struct UsageArgs {
    /// SQLite database path
    #[arg(long, env = "BILLTRACKER_DB", default_value = "billtracker.db")]
    pub db: PathBuf,
}

pub fn run(args: &UsageArgs, format: &OutputFormat) -> Result<()> {
    let db = Db::open(&args.db)?;
    db.init()?;

    let today = Utc::now().date_naive();
    let used = db.query_usage(&month_key(today))?;
    let usage = QuotaUsage::new(today, used, monthly_limit_from_env());

    match format {
        OutputFormat::Table => print_usage_table(&usage),
        OutputFormat::Json => print_json(&usage),
    }
    if usage.exhausted() {
        eprintln!("Monthly limit reached; syncs are paused until {}", usage.reset_date);
    }
    Ok(())
}
