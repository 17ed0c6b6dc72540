use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::{DEFAULT_FRONTIER_EPSILON, DEFAULT_FRONTIER_ITERATIONS, DEFAULT_FRONTIER_POINTS};
use crate::error::PortfolioRiskError;
use crate::sampling::{rng_from_seed, RandomSource, SearchControl};
use crate::types::{
    ensure_finite, validate_asset_profiles, with_metadata_f64, AssetProfile, ComputationOutput,
};
use crate::PortfolioRiskResult;

use super::metrics::calculate_sharpe_ratio;
use super::search::{default_risk_free_rate, draw_simplex_weights, to_allocations, PortfolioAllocation, SearchSpace};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierInput {
    pub assets: Vec<AssetProfile>,
    /// Number of target returns swept between the lowest and highest asset return
    #[serde(default = "default_points")]
    pub frontier_points: u32,
    /// Random trials per target return
    #[serde(default = "default_iterations_per_point")]
    pub iterations_per_point: u32,
    /// Max distance between a trial's return and the target
    #[serde(default = "default_epsilon")]
    pub epsilon: f64,
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
}

fn default_points() -> u32 {
    DEFAULT_FRONTIER_POINTS
}

fn default_iterations_per_point() -> u32 {
    DEFAULT_FRONTIER_ITERATIONS
}

fn default_epsilon() -> f64 {
    DEFAULT_FRONTIER_EPSILON
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EfficientFrontierPoint {
    pub target_return: f64,
    pub expected_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub allocations: Vec<PortfolioAllocation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrontierOutput {
    /// Sorted by non-decreasing volatility
    pub points: Vec<EfficientFrontierPoint>,
    pub targets_requested: u32,
    pub targets_filled: u32,
    /// Point with the highest Sharpe ratio, if any
    pub max_sharpe_index: Option<usize>,
}

/// Evenly spaced targets from `lo` to `hi` inclusive.
fn target_returns(lo: f64, hi: f64, points: u32) -> Vec<f64> {
    if points == 1 {
        return vec![lo];
    }
    let step = (hi - lo) / (points - 1) as f64;
    (0..points).map(|k| lo + step * k as f64).collect()
}

/// Trace the efficient frontier by constrained random search.
pub fn generate_efficient_frontier(
    input: &FrontierInput,
) -> PortfolioRiskResult<ComputationOutput<FrontierOutput>> {
    let mut rng = rng_from_seed(input.seed);
    let control = SearchControl::unbounded().with_budget_ms(input.time_budget_ms);
    generate_efficient_frontier_with(input, &mut rng, &control)
}

/// For each target return keep the lowest-volatility sampled portfolio whose
/// return is within `epsilon`. Targets with no match are left out.
pub fn generate_efficient_frontier_with<R: RandomSource + ?Sized>(
    input: &FrontierInput,
    rng: &mut R,
    control: &SearchControl,
) -> PortfolioRiskResult<ComputationOutput<FrontierOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_asset_profiles(&input.assets)?;
    if input.frontier_points == 0 {
        return Err(PortfolioRiskError::invalid("frontier_points", "Must be at least 1"));
    }
    if input.iterations_per_point == 0 {
        return Err(PortfolioRiskError::invalid(
            "iterations_per_point",
            "Must be at least 1",
        ));
    }
    if !input.epsilon.is_finite() || input.epsilon < 0.0 {
        return Err(PortfolioRiskError::invalid(
            "epsilon",
            "Must be finite and non-negative",
        ));
    }
    ensure_finite("risk_free_rate", input.risk_free_rate)?;

    let space = SearchSpace::new(&input.assets)?;
    let n = input.assets.len();
    let lo = space
        .expected_returns
        .iter()
        .copied()
        .fold(f64::INFINITY, f64::min);
    let hi = space
        .expected_returns
        .iter()
        .copied()
        .fold(f64::NEG_INFINITY, f64::max);

    let mut points: Vec<EfficientFrontierPoint> = Vec::new();
    let mut trial = vec![0.0; n];
    let mut stopped = false;

    'targets: for target in target_returns(lo, hi, input.frontier_points) {
        let mut best: Option<(Vec<f64>, f64, f64)> = None;
        for i in 0..input.iterations_per_point {
            if i % 256 == 0 && control.should_stop() {
                stopped = true;
                break 'targets;
            }
            if !draw_simplex_weights(rng, &mut trial) {
                continue;
            }
            let (ret, vol) = space.evaluate(&trial);
            if (ret - target).abs() > input.epsilon {
                continue;
            }
            if best.as_ref().map_or(true, |(_, _, v)| vol < *v) {
                best = Some((trial.clone(), ret, vol));
            }
        }
        if let Some((weights, ret, vol)) = best {
            points.push(EfficientFrontierPoint {
                target_return: target,
                expected_return: ret,
                volatility: vol,
                sharpe_ratio: calculate_sharpe_ratio(ret, vol, input.risk_free_rate),
                allocations: to_allocations(&input.assets, &weights),
            });
        }
    }

    if stopped {
        tracing::warn!(filled = points.len(), "frontier generation stopped early");
        warnings.push(format!(
            "Frontier generation stopped early; {} points computed",
            points.len()
        ));
    }

    points.sort_by(|a, b| a.volatility.total_cmp(&b.volatility));

    let targets_filled = points.len() as u32;
    if targets_filled < input.frontier_points && !stopped {
        warnings.push(format!(
            "{} of {} target returns had no sampled portfolio within epsilon {}",
            input.frontier_points - targets_filled,
            input.frontier_points,
            input.epsilon
        ));
    }

    let max_sharpe_index = points
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.sharpe_ratio.total_cmp(&b.sharpe_ratio))
        .map(|(i, _)| i);

    tracing::debug!(assets = n, targets_filled, "efficient frontier generated");

    let output = FrontierOutput {
        points,
        targets_requested: input.frontier_points,
        targets_filled,
        max_sharpe_index,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Efficient Frontier (constrained random search per target return)",
        &serde_json::json!({
            "n_assets": n,
            "frontier_points": input.frontier_points,
            "iterations_per_point": input.iterations_per_point,
            "epsilon": input.epsilon,
            "return_range": [lo, hi],
            "seed": input.seed,
        }),
        warnings,
        elapsed,
        output,
    ))
}
