//! The `bills` subcommand: list bills already stored for a state.

use std::path::PathBuf;

use anyhow::Result;
use billtracker_lib::validation::validate_state;
use billtracker_lib::Db;
use clap::Args;

use crate::output::{print_bills_table, print_json, OutputFormat};

#[derive(Args)]
pub struct BillsArgs {
    /// Two-letter state code (e.g. CA)
    #[arg(long)]
    pub state: String,

    /// Maximum rows to show
    #[arg(long, default_value = "20")]
    pub limit: usize,

    /// SQLite database path
    #[arg(long, env = "BILLTRACKER_DB", default_value = "billtracker.db")]
    pub db: PathBuf,
}

pub fn run(args: &BillsArgs, format: &OutputFormat) -> Result<()> {
    let state = validate_state(&args.state)?;
    let db = Db::open(&args.db)?;
    db.init()?;

    let bills = db.bills_for_state(&state, args.limit)?;
    if bills.is_empty() {
        eprintln!(
            "No bills stored for {}. Run 'billtracker sync --state {}' first.",
            state, state
        );
        return Ok(());
    }

    match format {
        OutputFormat::Table => print_bills_table(&bills),
        OutputFormat::Json => print_json(&bills),
    }
    Ok(())
}
