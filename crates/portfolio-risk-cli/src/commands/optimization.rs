use serde::Deserialize;

use portfolio_risk_core::config::EngineConfig;
use portfolio_risk_core::optimization::covariance::build_covariance_matrix;
use portfolio_risk_core::optimization::frontier::{generate_efficient_frontier, FrontierInput};
use portfolio_risk_core::optimization::search::{optimize_portfolio, OptimizeInput};
use portfolio_risk_core::AssetProfile;

use super::{CommandResult, InputArgs};
use crate::input;

#[derive(Deserialize)]
struct CovarianceRequest {
    assets: Vec<AssetProfile>,
}

pub fn run_covariance(args: InputArgs, config: Option<&EngineConfig>) -> CommandResult {
    let request: CovarianceRequest =
        input::load(args.input.as_deref(), config, "covariance matrix")?;
    let matrix = build_covariance_matrix(&request.assets)?;
    Ok(serde_json::json!({ "result": matrix }))
}

pub fn run_optimize(args: InputArgs, config: Option<&EngineConfig>) -> CommandResult {
    let opt_input: OptimizeInput =
        input::load(args.input.as_deref(), config, "portfolio optimization")?;
    let result = optimize_portfolio(&opt_input)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_frontier(args: InputArgs, config: Option<&EngineConfig>) -> CommandResult {
    let frontier_input: FrontierInput =
        input::load(args.input.as_deref(), config, "efficient frontier")?;
    let result = generate_efficient_frontier(&frontier_input)?;
    Ok(serde_json::to_value(result)?)
}
