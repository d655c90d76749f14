//! The `sessions` subcommand.

use anyhow::Result;
use billtracker_lib::validation::validate_state;
use billtracker_lib::{CachedClient, ClientConfig};
use clap::Args;

use crate::output::{print_json, print_sessions_table, OutputFormat};

#[derive(Args)]
pub struct SessionsArgs {
    /// Two-letter state code (e.g. CA)
    #[arg(long)]
    pub state: String,
}

pub async fn run(args: &SessionsArgs, format: &OutputFormat) -> Result<()> {
    let state = validate_state(&args.state)?;
    let client = CachedClient::from_config(&ClientConfig::from_env()?)?;

    let sessions = client.list_sessions(&state).await?;
    let current = client.current_session(&state).await?.map(|s| s.session_id);

    match format {
        OutputFormat::Table => print_sessions_table(&sessions, current),
        OutputFormat::Json => print_json(&sessions),
    }
    Ok(())
}
