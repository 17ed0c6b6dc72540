use portfolio_risk_core::config::EngineConfig;
use portfolio_risk_core::monte_carlo::projection::{run_monte_carlo_projection, ProjectionInput};

use super::{CommandResult, InputArgs};
use crate::input;

pub fn run_projection(args: InputArgs, config: Option<&EngineConfig>) -> CommandResult {
    let proj_input: ProjectionInput =
        input::load(args.input.as_deref(), config, "Monte Carlo projection")?;
    let result = run_monte_carlo_projection(&proj_input)?;
    Ok(serde_json::to_value(result)?)
}
