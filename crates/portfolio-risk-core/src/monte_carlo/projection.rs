use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::DEFAULT_NUM_SIMULATIONS;
use crate::error::PortfolioRiskError;
use crate::sampling::stats::{mean, percentile_sorted, sort_ascending};
use crate::sampling::{rng_from_seed, standard_normal, RandomSource};
use crate::types::{ensure_finite, with_metadata_f64, ComputationOutput};
use crate::PortfolioRiskResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Forward projection of a candidate portfolio's wealth.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionInput {
    /// Starting wealth
    pub initial_value: f64,
    /// Annualized expected return of the portfolio
    pub expected_return: f64,
    /// Annualized volatility of the portfolio
    pub expected_volatility: f64,
    /// Horizon in whole years
    pub years: u32,
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    /// Optional goal; reports the probability of ending at or above it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_value: Option<f64>,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_num_simulations() -> u32 {
    DEFAULT_NUM_SIMULATIONS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionPercentiles {
    pub p5: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionOutput {
    pub num_simulations: u32,
    pub years: u32,
    pub percentiles: ProjectionPercentiles,
    pub mean: f64,
    pub best_case: f64,
    pub worst_case: f64,
    /// Share of paths ending below the initial value
    pub probability_of_loss: f64,
    /// Share of paths ending at or above `target_value`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability_of_target: Option<f64>,
    /// Compound annual growth rate implied by the median path
    pub median_cagr: f64,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Simulate terminal wealth over `years` of normally distributed annual
/// returns compounded multiplicatively.
pub fn run_monte_carlo_projection(
    input: &ProjectionInput,
) -> PortfolioRiskResult<ComputationOutput<ProjectionOutput>> {
    let mut rng = rng_from_seed(input.seed);
    run_monte_carlo_projection_with(input, &mut rng)
}

pub fn run_monte_carlo_projection_with<R: RandomSource + ?Sized>(
    input: &ProjectionInput,
    rng: &mut R,
) -> PortfolioRiskResult<ComputationOutput<ProjectionOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate(input)?;

    let n = input.num_simulations as usize;
    let mut terminal: Vec<f64> = Vec::with_capacity(n);
    let mut wiped_out: u32 = 0;

    for _ in 0..n {
        let mut wealth = input.initial_value;
        for _ in 0..input.years {
            let annual = input.expected_return + input.expected_volatility * standard_normal(rng);
            wealth *= 1.0 + annual;
            if wealth <= 0.0 {
                wealth = 0.0;
                wiped_out += 1;
                break;
            }
        }
        terminal.push(wealth);
    }

    if wiped_out > 0 {
        warnings.push(format!(
            "{wiped_out} of {n} paths lost all value (annual return below -100%)"
        ));
    }

    sort_ascending(&mut terminal);

    let percentiles = ProjectionPercentiles {
        p5: percentile_sorted(&terminal, 5.0),
        p25: percentile_sorted(&terminal, 25.0),
        p50: percentile_sorted(&terminal, 50.0),
        p75: percentile_sorted(&terminal, 75.0),
        p95: percentile_sorted(&terminal, 95.0),
    };

    let nf = n as f64;
    let below = terminal.iter().filter(|v| **v < input.initial_value).count();
    let probability_of_target = input
        .target_value
        .map(|t| terminal.iter().filter(|v| **v >= t).count() as f64 / nf);

    let median_cagr = if percentiles.p50 > 0.0 {
        (percentiles.p50 / input.initial_value).powf(1.0 / input.years as f64) - 1.0
    } else {
        -1.0
    };

    let output = ProjectionOutput {
        num_simulations: input.num_simulations,
        years: input.years,
        mean: mean(&terminal),
        best_case: terminal[n - 1],
        worst_case: terminal[0],
        percentiles,
        probability_of_loss: below as f64 / nf,
        probability_of_target,
        median_cagr,
    };

    tracing::debug!(
        paths = n,
        years = input.years,
        median = output.percentiles.p50,
        "wealth projection finished"
    );

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo Wealth Projection (Box-Muller normal annual returns)",
        &serde_json::json!({
            "initial_value": input.initial_value,
            "expected_return": input.expected_return,
            "expected_volatility": input.expected_volatility,
            "years": input.years,
            "num_simulations": input.num_simulations,
            "seed": input.seed,
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn validate(input: &ProjectionInput) -> PortfolioRiskResult<()> {
    ensure_finite("initial_value", input.initial_value)?;
    ensure_finite("expected_return", input.expected_return)?;
    ensure_finite("expected_volatility", input.expected_volatility)?;
    if input.initial_value <= 0.0 {
        return Err(PortfolioRiskError::invalid("initial_value", "Must be positive"));
    }
    if input.expected_volatility < 0.0 {
        return Err(PortfolioRiskError::invalid(
            "expected_volatility",
            "Cannot be negative",
        ));
    }
    if input.years == 0 {
        return Err(PortfolioRiskError::invalid("years", "Must be at least 1"));
    }
    if input.num_simulations == 0 {
        return Err(PortfolioRiskError::invalid(
            "num_simulations",
            "Must be at least 1",
        ));
    }
    if let Some(t) = input.target_value {
        ensure_finite("target_value", t)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
