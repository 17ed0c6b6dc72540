use clap::Args;
use serde_json::Value;

use portfolio_risk_core::config::EngineConfig;
use portfolio_risk_core::stress::historical::{run_historical_scenario, HistoricalStressInput};
use portfolio_risk_core::stress::path_stress::{run_monte_carlo_stress, StressTestInput};
use portfolio_risk_core::stress::scenarios::list_crisis_scenarios;
use portfolio_risk_core::stress::sensitivity::{run_sensitivity_analysis, SensitivityInput};
use portfolio_risk_core::stress::var::{calculate_parametric_var, ParametricVarInput};

use super::{CommandResult, InputArgs};
use crate::input;

/// Arguments for a historical crisis replay
#[derive(Args)]
pub struct HistoricalArgs {
    /// Path to JSON input file
    #[arg(long)]
    pub input: Option<String>,
    /// Scenario id; overrides `scenario_id` in the input
    #[arg(long)]
    pub scenario: Option<String>,
}

pub fn run_path_stress(args: InputArgs, config: Option<&EngineConfig>) -> CommandResult {
    let stress_input: StressTestInput =
        input::load(args.input.as_deref(), config, "Monte Carlo stress test")?;
    let result = run_monte_carlo_stress(&stress_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_historical(args: HistoricalArgs, config: Option<&EngineConfig>) -> CommandResult {
    let mut value = input::load_value(args.input.as_deref(), config, "historical stress test")?;
    if let (Some(id), Value::Object(map)) = (args.scenario, &mut value) {
        map.insert("scenario_id".into(), Value::String(id));
    }
    let hist_input: HistoricalStressInput = serde_json::from_value(value)
        .map_err(|e| format!("Invalid historical stress test input: {e}"))?;
    let result = run_historical_scenario(&hist_input.scenario_id, &hist_input.holdings)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_list_scenarios() -> CommandResult {
    Ok(serde_json::to_value(list_crisis_scenarios())?)
}

pub fn run_sensitivity(args: InputArgs, config: Option<&EngineConfig>) -> CommandResult {
    let sens_input: SensitivityInput =
        input::load(args.input.as_deref(), config, "sensitivity analysis")?;
    let result = run_sensitivity_analysis(&sens_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_var(args: InputArgs, config: Option<&EngineConfig>) -> CommandResult {
    let var_input: ParametricVarInput =
        input::load(args.input.as_deref(), config, "parametric VaR")?;
    let result = calculate_parametric_var(&var_input)?;
    Ok(serde_json::to_value(result)?)
}
