use portfolio_risk_core::analytics::performance::{calculate_performance_metrics, PerformanceInput};
use portfolio_risk_core::config::EngineConfig;

use super::{CommandResult, InputArgs};
use crate::input;

pub fn run_performance(args: InputArgs, config: Option<&EngineConfig>) -> CommandResult {
    let perf_input: PerformanceInput =
        input::load(args.input.as_deref(), config, "performance analytics")?;
    let result = calculate_performance_metrics(&perf_input)?;
    Ok(serde_json::to_value(result)?)
}
