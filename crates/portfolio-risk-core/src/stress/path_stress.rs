use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::report::{
    generate_recommendations, AssetImpact, PercentilePoint, RiskLevel, StressMode,
    StressTestResult, DISTRIBUTION_PERCENTILES,
};
use crate::config::{DEFAULT_CONFIDENCE_LEVEL, DEFAULT_NUM_SIMULATIONS, TRADING_DAYS_PER_YEAR};
use crate::error::PortfolioRiskError;
use crate::sampling::stats::{mean, percentile_sorted, sort_ascending};
use crate::sampling::{rng_from_seed, standard_normal, RandomSource};
use crate::types::{ensure_finite, validate_holdings, with_metadata_f64, ComputationOutput, Holding};
use crate::PortfolioRiskResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestInput {
    pub holdings: Vec<Holding>,
    #[serde(default = "default_num_simulations")]
    pub num_simulations: u32,
    #[serde(default = "default_time_horizon_days")]
    pub time_horizon_days: u32,
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    /// Scales every holding's daily volatility (2.0 = doubled vol regime)
    #[serde(default = "default_volatility_multiplier")]
    pub volatility_multiplier: f64,
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_num_simulations() -> u32 {
    DEFAULT_NUM_SIMULATIONS
}

fn default_time_horizon_days() -> u32 {
    10
}

fn default_confidence_level() -> f64 {
    DEFAULT_CONFIDENCE_LEVEL
}

fn default_volatility_multiplier() -> f64 {
    1.0
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Simulate daily independent normal moves of every holding and report the
/// tail of the resulting portfolio value distribution.
pub fn run_monte_carlo_stress(
    input: &StressTestInput,
) -> PortfolioRiskResult<ComputationOutput<StressTestResult>> {
    let mut rng = rng_from_seed(input.seed);
    run_monte_carlo_stress_with(input, &mut rng)
}

pub fn run_monte_carlo_stress_with<R: RandomSource + ?Sized>(
    input: &StressTestInput,
    rng: &mut R,
) -> PortfolioRiskResult<ComputationOutput<StressTestResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let base_value = validate(input)?;
    let holdings = &input.holdings;
    let n_assets = holdings.len();
    let n_paths = input.num_simulations as usize;

    let current: Vec<f64> = holdings.iter().map(Holding::market_value).collect();
    let daily_sigma: Vec<f64> = holdings
        .iter()
        .map(|h| h.effective_volatility() / TRADING_DAYS_PER_YEAR.sqrt() * input.volatility_multiplier)
        .collect();

    // Row-major: path p, asset i at p * n_assets + i
    let mut asset_paths: Vec<f64> = Vec::with_capacity(n_paths * n_assets);
    let mut portfolio: Vec<f64> = Vec::with_capacity(n_paths);
    let mut floored: u32 = 0;

    for _ in 0..n_paths {
        let mut total = 0.0;
        for i in 0..n_assets {
            let mut value = current[i];
            for _ in 0..input.time_horizon_days {
                value *= 1.0 + daily_sigma[i] * standard_normal(rng);
                if value <= 0.0 {
                    value = 0.0;
                    floored += 1;
                    break;
                }
            }
            asset_paths.push(value);
            total += value;
        }
        portfolio.push(total);
    }

    if floored > 0 {
        warnings.push(format!(
            "{floored} simulated holding paths were floored at zero value"
        ));
    }

    let mut sorted = portfolio.clone();
    sort_ascending(&mut sorted);

    let tail_pct = (1.0 - input.confidence_level) * 100.0;
    let threshold = percentile_sorted(&sorted, tail_pct);
    let value_at_risk = base_value - threshold;

    let mut tail: Vec<usize> = (0..n_paths).filter(|&p| portfolio[p] < threshold).collect();
    if tail.is_empty() {
        tail = (0..n_paths).filter(|&p| portfolio[p] <= threshold).collect();
    }
    let tail_values: Vec<f64> = tail.iter().map(|&p| portfolio[p]).collect();
    let conditional_var = base_value - mean(&tail_values);

    let tail_losses: Vec<f64> = (0..n_assets)
        .map(|i| {
            let losses: Vec<f64> = tail
                .iter()
                .map(|&p| current[i] - asset_paths[p * n_assets + i])
                .collect();
            mean(&losses)
        })
        .collect();
    let total_tail_loss: f64 = tail_losses.iter().sum();

    let asset_impacts: Vec<AssetImpact> = holdings
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let stressed: Vec<f64> = (0..n_paths)
                .map(|p| asset_paths[p * n_assets + i])
                .collect();
            let stressed_value = mean(&stressed);
            let loss = current[i] - stressed_value;
            AssetImpact {
                symbol: h.symbol.clone(),
                asset_class: h.asset_class,
                current_value: current[i],
                stressed_value,
                loss,
                loss_percent: if current[i] > 0.0 { loss / current[i] * 100.0 } else { 0.0 },
                risk_contribution: if total_tail_loss.abs() > f64::EPSILON {
                    tail_losses[i] / total_tail_loss
                } else {
                    0.0
                },
            }
        })
        .collect();

    let expected_loss = base_value - mean(&portfolio);
    let expected_loss_percent = expected_loss / base_value * 100.0;
    let var_percent = value_at_risk / base_value * 100.0;
    let risk_level = RiskLevel::from_simulated_loss_pct(var_percent);

    let percentiles = DISTRIBUTION_PERCENTILES
        .iter()
        .map(|&p| PercentilePoint {
            percentile: p,
            value: percentile_sorted(&sorted, p),
        })
        .collect();

    let recommendations =
        generate_recommendations(holdings, &asset_impacts, base_value, var_percent);

    tracing::debug!(
        paths = n_paths,
        horizon_days = input.time_horizon_days,
        var = value_at_risk,
        cvar = conditional_var,
        "path stress finished"
    );

    let result = StressTestResult {
        mode: StressMode::MonteCarlo,
        portfolio_value: base_value,
        expected_loss,
        expected_loss_percent,
        worst_case_value: sorted[0],
        best_case_value: sorted[n_paths - 1],
        value_at_risk,
        conditional_var,
        confidence_level: input.confidence_level,
        percentiles,
        asset_impacts,
        risk_level,
        recommendations,
        scenario: None,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Monte Carlo Stress Test (independent daily normal shocks)",
        &serde_json::json!({
            "num_simulations": input.num_simulations,
            "time_horizon_days": input.time_horizon_days,
            "confidence_level": input.confidence_level,
            "volatility_multiplier": input.volatility_multiplier,
            "trading_days_per_year": TRADING_DAYS_PER_YEAR,
            "correlation": "assets shocked independently",
            "seed": input.seed,
        }),
        warnings,
        elapsed,
        result,
    ))
}

fn validate(input: &StressTestInput) -> PortfolioRiskResult<f64> {
    let base_value = validate_holdings(&input.holdings)?;
    if input.num_simulations == 0 {
        return Err(PortfolioRiskError::invalid(
            "num_simulations",
            "Must be at least 1",
        ));
    }
    if input.time_horizon_days == 0 {
        return Err(PortfolioRiskError::invalid(
            "time_horizon_days",
            "Must be at least 1",
        ));
    }
    ensure_finite("confidence_level", input.confidence_level)?;
    if input.confidence_level <= 0.0 || input.confidence_level >= 1.0 {
        return Err(PortfolioRiskError::invalid(
            "confidence_level",
            "Must be in (0, 1)",
        ));
    }
    ensure_finite("volatility_multiplier", input.volatility_multiplier)?;
    if input.volatility_multiplier < 0.0 {
        return Err(PortfolioRiskError::invalid(
            "volatility_multiplier",
            "Cannot be negative",
        ));
    }
    Ok(base_value)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::FixedSequence;
    use crate::types::AssetClass;

    fn holding(symbol: &str, class: AssetClass, qty: f64, price: f64) -> Holding {
        Holding {
            symbol: symbol.into(),
            asset_class: class,
            quantity: qty,
            current_price: price,
            volatility: None,
            beta: None,
        }
    }

    fn sample_input() -> StressTestInput {
        StressTestInput {
            holdings: vec![
                holding("SPY", AssetClass::Stock, 100.0, 450.0),
                holding("BTC", AssetClass::Crypto, 0.5, 60_000.0),
                holding("TLT", AssetClass::Bond, 200.0, 95.0),
            ],
            num_simulations: 5_000,
            time_horizon_days: 10,
            confidence_level: 0.95,
            volatility_multiplier: 1.0,
            seed: Some(7),
        }
    }

    #[test]
    fn test_tail_metrics_ordering() {
        let out = run_monte_carlo_stress(&sample_input()).unwrap().result;
        assert_eq!(out.mode, StressMode::MonteCarlo);
        assert!((out.portfolio_value - 94_000.0).abs() < 1e-9);
        assert!(out.value_at_risk > 0.0);
        assert!(out.conditional_var >= out.value_at_risk);
        assert!(out.worst_case_value <= out.best_case_value);
        for w in out.percentiles.windows(2) {
            assert!(w[0].value <= w[1].value);
        }
        assert_eq!(out.percentiles.len(), 9);
    }

    #[test]
    fn test_contributions_sum_to_one() {
        let out = run_monte_carlo_stress(&sample_input()).unwrap().result;
        let total: f64 = out.asset_impacts.iter().map(|a| a.risk_contribution).sum();
        assert!((total - 1.0).abs() < 1e-9, "total={total}");
        // Crypto dominates tail risk
        let btc = out.asset_impacts.iter().find(|a| a.symbol == "BTC").unwrap();
        let tlt = out.asset_impacts.iter().find(|a| a.symbol == "TLT").unwrap();
        assert!(btc.risk_contribution > tlt.risk_contribution);
    }

    #[test]
    fn test_zero_multiplier_has_no_loss() {
        let inp = StressTestInput {
            volatility_multiplier: 0.0,
            num_simulations: 50,
            ..sample_input()
        };
        let out = run_monte_carlo_stress(&inp).unwrap().result;
        assert!(out.value_at_risk.abs() < 1e-9);
        assert!(out.expected_loss.abs() < 1e-9);
        assert_eq!(out.risk_level, RiskLevel::Low);
        assert!(out.asset_impacts.iter().all(|a| a.risk_contribution == 0.0));
    }

    #[test]
    fn test_higher_multiplier_raises_var() {
        let calm = run_monte_carlo_stress(&sample_input()).unwrap().result;
        let inp = StressTestInput {
            volatility_multiplier: 3.0,
            ..sample_input()
        };
        let stressed = run_monte_carlo_stress(&inp).unwrap().result;
        assert!(stressed.value_at_risk > calm.value_at_risk);
    }

    #[test]
    fn test_fixed_sequence_is_deterministic() {
        // u1 = e^-0.5, u2 = 0 => z = 1 on every draw
        let inp = StressTestInput {
            holdings: vec![Holding {
                volatility: Some(0.252_f64.sqrt() * 0.1),
                ..holding("SPY", AssetClass::Stock, 1.0, 100.0)
            }],
            num_simulations: 3,
            time_horizon_days: 1,
            confidence_level: 0.95,
            volatility_multiplier: 1.0,
            seed: None,
        };
        let mut seq = FixedSequence::new(vec![(-0.5_f64).exp(), 0.0]);
        let out = run_monte_carlo_stress_with(&inp, &mut seq).unwrap().result;
        // daily sigma = sqrt(0.252) * 0.1 / sqrt(252) = 0.1 / sqrt(1000)
        let expected = 100.0 * (1.0 + 0.1 / 1000_f64.sqrt());
        assert!((out.best_case_value - expected).abs() < 1e-9);
        assert!((out.worst_case_value - expected).abs() < 1e-9);
    }

    #[test]
    fn test_seeded_reproducibility() {
        let a = run_monte_carlo_stress(&sample_input()).unwrap().result;
        let b = run_monte_carlo_stress(&sample_input()).unwrap().result;
        assert_eq!(a.value_at_risk, b.value_at_risk);
        assert_eq!(a.conditional_var, b.conditional_var);
    }

    #[test]
    fn test_validation() {
        let mut inp = sample_input();
        inp.confidence_level = 1.0;
        assert!(run_monte_carlo_stress(&inp).is_err());
        let mut inp = sample_input();
        inp.num_simulations = 0;
        assert!(run_monte_carlo_stress(&inp).is_err());
        let mut inp = sample_input();
        inp.holdings.clear();
        assert!(run_monte_carlo_stress(&inp).is_err());
        let mut inp = sample_input();
        inp.volatility_multiplier = -1.0;
        assert!(run_monte_carlo_stress(&inp).is_err());
    }
}
