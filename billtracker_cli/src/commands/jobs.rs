//! The `jobs` subcommand.

use std::path::PathBuf;

use anyhow::Result;
use billtracker_lib::Db;
use clap::Args;

use crate::output::{print_jobs_table, print_json, OutputFormat};

#[derive(Args)]
pub struct JobsArgs {
    /// Maximum jobs to show, newest first
    #[arg(long, default_value = "10")]
    pub limit: usize,

    /// SQLite database path
    #[arg(long, env = "BILLTRACKER_DB", default_value = "billtracker.db")]
    pub db: PathBuf,
}

pub fn run(args: &JobsArgs, format: &OutputFormat) -> Result<()> {
    let db = Db::open(&args.db)?;
    db.init()?;

    let jobs = db.recent_jobs(args.limit)?;
    match format {
        OutputFormat::Table => print_jobs_table(&jobs),
        OutputFormat::Json => print_json(&jobs),
    }
    Ok(())
}
