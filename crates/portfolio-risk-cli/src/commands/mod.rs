pub mod analytics;
pub mod correlation;
pub mod monte_carlo;
pub mod optimization;
pub mod rebalancing;
pub mod stress;

use clap::Args;

/// Shared `--input` flag; stdin is read when it is omitted.
#[derive(Args)]
pub struct InputArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
}

pub type CommandResult = Result<serde_json::Value, Box<dyn std::error::Error>>;
