//! CLI subcommand implementations.

pub mod bills;
pub mod jobs;
pub mod sessions;
pub mod sync;
pub mod usage;
