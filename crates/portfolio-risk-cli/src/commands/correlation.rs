use serde::Deserialize;

use portfolio_risk_core::config::{EngineConfig, DEFAULT_HISTORY_RETENTION};
use portfolio_risk_core::correlation::history::{AssetKey, InMemoryPriceHistory, PriceSample};
use portfolio_risk_core::correlation::matrix::{calculate_correlation_matrix, CorrelationMatrixInput};

use super::{CommandResult, InputArgs};
use crate::input;

/// Price series shipped alongside the matrix request.
#[derive(Deserialize)]
struct SeriesInput {
    #[serde(flatten)]
    key: AssetKey,
    samples: Vec<PriceSample>,
}

#[derive(Deserialize)]
struct CorrelationRequest {
    #[serde(flatten)]
    matrix: CorrelationMatrixInput,
    #[serde(default)]
    history: Vec<SeriesInput>,
    #[serde(default = "default_retention")]
    retention: usize,
}

fn default_retention() -> usize {
    DEFAULT_HISTORY_RETENTION
}

pub fn run_correlation(args: InputArgs, config: Option<&EngineConfig>) -> CommandResult {
    let request: CorrelationRequest =
        input::load(args.input.as_deref(), config, "correlation matrix")?;

    let repo = InMemoryPriceHistory::with_retention(request.retention);
    for series in request.history {
        repo.extend(&series.key, series.samples)?;
    }

    let result = calculate_correlation_matrix(&request.matrix, &repo)?;
    Ok(serde_json::to_value(result)?)
}
