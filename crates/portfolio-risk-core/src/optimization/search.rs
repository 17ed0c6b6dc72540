use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::{DEFAULT_OPTIMIZER_ITERATIONS, DEFAULT_RISK_FREE_RATE};
use crate::error::PortfolioRiskError;
use crate::sampling::{rng_from_seed, RandomSource, SearchControl};
use crate::types::{with_metadata_f64, AssetClass, AssetProfile, ComputationOutput};
use crate::PortfolioRiskResult;

use super::covariance::{build_covariance_matrix, CovarianceMatrix};
use super::metrics::{calculate_portfolio_return, calculate_sharpe_ratio, diversification_score};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Investor risk tolerance. Each tier accepts portfolios whose volatility
/// lies inside a fixed band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskProfile {
    Conservative,
    ModeratelyConservative,
    #[default]
    Moderate,
    ModeratelyAggressive,
    Aggressive,
}

impl RiskProfile {
    /// Accepted annualized volatility range, inclusive.
    pub fn volatility_band(self) -> (f64, f64) {
        match self {
            RiskProfile::Conservative => (0.03, 0.08),
            RiskProfile::ModeratelyConservative => (0.06, 0.12),
            RiskProfile::Moderate => (0.10, 0.16),
            RiskProfile::ModeratelyAggressive => (0.14, 0.22),
            RiskProfile::Aggressive => (0.18, 0.40),
        }
    }

    pub fn target_volatility(self) -> f64 {
        match self {
            RiskProfile::Conservative => 0.05,
            RiskProfile::ModeratelyConservative => 0.09,
            RiskProfile::Moderate => 0.13,
            RiskProfile::ModeratelyAggressive => 0.18,
            RiskProfile::Aggressive => 0.25,
        }
    }

    pub fn accepts(self, volatility: f64) -> bool {
        let (lo, hi) = self.volatility_band();
        volatility >= lo && volatility <= hi
    }
}

/// Input to the stochastic-search optimizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizeInput {
    pub assets: Vec<AssetProfile>,
    #[serde(default)]
    pub risk_profile: RiskProfile,
    /// Number of random weight vectors to evaluate
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default = "default_risk_free_rate")]
    pub risk_free_rate: f64,
    /// Optional seed for reproducibility
    #[serde(default)]
    pub seed: Option<u64>,
    /// Optional wall-clock budget; the best portfolio so far is returned
    #[serde(default)]
    pub time_budget_ms: Option<u64>,
}

fn default_iterations() -> u32 {
    DEFAULT_OPTIMIZER_ITERATIONS
}

pub(crate) fn default_risk_free_rate() -> f64 {
    DEFAULT_RISK_FREE_RATE
}

/// One asset's weight in a portfolio.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PortfolioAllocation {
    pub symbol: String,
    pub asset_class: AssetClass,
    pub weight: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizedPortfolio {
    pub allocations: Vec<PortfolioAllocation>,
    pub expected_return: f64,
    pub expected_volatility: f64,
    pub sharpe_ratio: f64,
    /// 0..=100
    pub diversification_score: f64,
    pub risk_profile: RiskProfile,
    pub target_volatility: f64,
    pub volatility_band: (f64, f64),
    /// True when no sampled portfolio fell inside the band
    pub used_fallback: bool,
    /// Trials whose volatility fell inside the band
    pub feasible_trials: u32,
    pub trials_run: u32,
}

// ---------------------------------------------------------------------------
// Sampling core (shared with the frontier generator)
// ---------------------------------------------------------------------------

/// Pre-computed inputs for evaluating many weight vectors.
pub(crate) struct SearchSpace {
    pub covariance: CovarianceMatrix,
    pub expected_returns: Vec<f64>,
}

impl SearchSpace {
    pub fn new(assets: &[AssetProfile]) -> PortfolioRiskResult<Self> {
        Ok(Self {
            covariance: build_covariance_matrix(assets)?,
            expected_returns: assets.iter().map(|a| a.expected_return).collect(),
        })
    }

    /// (expected return, volatility)
    pub fn evaluate(&self, weights: &[f64]) -> (f64, f64) {
        (
            calculate_portfolio_return(weights, &self.expected_returns),
            self.covariance.portfolio_volatility(weights),
        )
    }
}

/// Fill `weights` with independent uniforms normalized to sum to 1.
/// Returns false on the (measure-zero) all-zero draw.
pub(crate) fn draw_simplex_weights<R: RandomSource + ?Sized>(
    rng: &mut R,
    weights: &mut [f64],
) -> bool {
    let mut total = 0.0;
    for w in weights.iter_mut() {
        *w = rng.next_uniform();
        total += *w;
    }
    if total <= 0.0 {
        return false;
    }
    for w in weights.iter_mut() {
        *w /= total;
    }
    true
}

pub(crate) fn equal_weights(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

pub(crate) fn to_allocations(assets: &[AssetProfile], weights: &[f64]) -> Vec<PortfolioAllocation> {
    assets
        .iter()
        .zip(weights.iter())
        .map(|(a, w)| PortfolioAllocation {
            symbol: a.symbol.clone(),
            asset_class: a.asset_class,
            weight: *w,
        })
        .collect()
}

fn validate_input(input: &OptimizeInput) -> PortfolioRiskResult<()> {
    if input.iterations == 0 {
        return Err(PortfolioRiskError::invalid(
            "iterations",
            "Must be at least 1",
        ));
    }
    if !input.risk_free_rate.is_finite() {
        return Err(PortfolioRiskError::invalid(
            "risk_free_rate",
            "Must be a finite number",
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Maximize Sharpe ratio by random search within the risk profile's
/// volatility band. Randomness comes from `input.seed` (entropy if absent).
pub fn optimize_portfolio(
    input: &OptimizeInput,
) -> PortfolioRiskResult<ComputationOutput<OptimizedPortfolio>> {
    let mut rng: StdRng = rng_from_seed(input.seed);
    let control = SearchControl::unbounded().with_budget_ms(input.time_budget_ms);
    optimize_portfolio_with(input, &mut rng, &control)
}

/// As [`optimize_portfolio`], with an injected random source and stop signal.
///
/// When no trial lands in the band the result is the equal-weight portfolio
/// with `used_fallback` set; this never errors.
pub fn optimize_portfolio_with<R: RandomSource + ?Sized>(
    input: &OptimizeInput,
    rng: &mut R,
    control: &SearchControl,
) -> PortfolioRiskResult<ComputationOutput<OptimizedPortfolio>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate_input(input)?;
    let space = SearchSpace::new(&input.assets)?;
    let n = input.assets.len();
    let rf = input.risk_free_rate;
    let profile = input.risk_profile;

    let mut trial = vec![0.0; n];
    let mut best: Option<(Vec<f64>, f64)> = None;
    let mut feasible_trials: u32 = 0;
    let mut trials_run: u32 = 0;

    for i in 0..input.iterations {
        if i % 256 == 0 && control.should_stop() {
            warnings.push(format!(
                "Search stopped early after {} of {} trials",
                trials_run, input.iterations
            ));
            break;
        }
        trials_run += 1;
        if !draw_simplex_weights(rng, &mut trial) {
            continue;
        }
        let (ret, vol) = space.evaluate(&trial);
        if !profile.accepts(vol) {
            continue;
        }
        feasible_trials += 1;
        let sharpe = calculate_sharpe_ratio(ret, vol, rf);
        if best.as_ref().map_or(true, |(_, s)| sharpe > *s) {
            best = Some((trial.clone(), sharpe));
        }
    }

    let used_fallback = best.is_none();
    let weights = match best {
        Some((w, _)) => w,
        None => {
            let (lo, hi) = profile.volatility_band();
            tracing::warn!(
                ?profile,
                trials_run,
                "no sampled portfolio inside volatility band; using equal weights"
            );
            warnings.push(format!(
                "No sampled portfolio had volatility within [{lo:.2}, {hi:.2}]; fell back to equal weighting"
            ));
            equal_weights(n)
        }
    };

    let (expected_return, expected_volatility) = space.evaluate(&weights);
    let sharpe_ratio = calculate_sharpe_ratio(expected_return, expected_volatility, rf);
    let classes: Vec<AssetClass> = input.assets.iter().map(|a| a.asset_class).collect();
    let score = diversification_score(&weights, &classes);

    tracing::debug!(
        assets = n,
        trials_run,
        feasible_trials,
        sharpe_ratio,
        "portfolio search finished"
    );

    let output = OptimizedPortfolio {
        allocations: to_allocations(&input.assets, &weights),
        expected_return,
        expected_volatility,
        sharpe_ratio,
        diversification_score: score,
        risk_profile: profile,
        target_volatility: profile.target_volatility(),
        volatility_band: profile.volatility_band(),
        used_fallback,
        feasible_trials,
        trials_run,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Stochastic-Search Mean-Variance Optimization (max Sharpe within volatility band)",
        &serde_json::json!({
            "n_assets": n,
            "iterations": input.iterations,
            "risk_free_rate": rf,
            "risk_profile": profile,
            "seed": input.seed,
            "weight_sampling": "normalized independent uniforms",
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampling::FixedSequence;

    const SEED: u64 = 42;

    fn asset(symbol: &str, class: AssetClass, ret: f64, vol: f64) -> AssetProfile {
        AssetProfile {
            symbol: symbol.into(),
            asset_class: class,
            expected_return: ret,
            volatility: vol,
            current_price: 100.0,
            historical_returns: None,
        }
    }

    fn mixed_assets() -> Vec<AssetProfile> {
        vec![
            asset("SPY", AssetClass::Stock, 0.10, 0.18),
            asset("QQQ", AssetClass::Stock, 0.13, 0.24),
            asset("TLT", AssetClass::Bond, 0.04, 0.07),
            asset("GLD", AssetClass::Commodity, 0.06, 0.15),
            asset("BTC", AssetClass::Crypto, 0.35, 0.70),
        ]
    }

    fn input(profile: RiskProfile) -> OptimizeInput {
        OptimizeInput {
            assets: mixed_assets(),
            risk_profile: profile,
            iterations: 5_000,
            risk_free_rate: 0.045,
            seed: Some(SEED),
            time_budget_ms: None,
        }
    }

    #[test]
    fn test_weights_sum_to_one_every_profile() {
        for profile in [
            RiskProfile::Conservative,
            RiskProfile::ModeratelyConservative,
            RiskProfile::Moderate,
            RiskProfile::ModeratelyAggressive,
            RiskProfile::Aggressive,
        ] {
            let out = optimize_portfolio(&input(profile)).unwrap().result;
            let total: f64 = out.allocations.iter().map(|a| a.weight).sum();
            assert!((total - 1.0).abs() < 0.01, "{profile:?}: total={total}");
            assert!(out.allocations.iter().all(|a| (0.0..=1.0).contains(&a.weight)));
        }
    }

    #[test]
    fn test_result_inside_band_when_feasible() {
        let out = optimize_portfolio(&input(RiskProfile::Moderate)).unwrap().result;
        assert!(!out.used_fallback);
        assert!(out.feasible_trials > 0);
        let (lo, hi) = out.volatility_band;
        assert!(out.expected_volatility >= lo && out.expected_volatility <= hi);
    }

    #[test]
    fn test_equal_weight_fallback_when_band_unreachable() {
        // Every achievable volatility is below the aggressive band
        let assets = vec![
            asset("B1", AssetClass::Bond, 0.03, 0.02),
            asset("B2", AssetClass::Bond, 0.04, 0.03),
        ];
        let inp = OptimizeInput {
            assets,
            risk_profile: RiskProfile::Aggressive,
            iterations: 1_000,
            risk_free_rate: 0.045,
            seed: Some(SEED),
            time_budget_ms: None,
        };
        let result = optimize_portfolio(&inp).unwrap();
        let out = &result.result;
        assert!(out.used_fallback);
        assert_eq!(out.feasible_trials, 0);
        for a in &out.allocations {
            assert!((a.weight - 0.5).abs() < 1e-12);
        }
        assert!(result.warnings.iter().any(|w| w.contains("equal weighting")));
    }

    #[test]
    fn test_seeded_reproducibility() {
        let a = optimize_portfolio(&input(RiskProfile::Moderate)).unwrap().result;
        let b = optimize_portfolio(&input(RiskProfile::Moderate)).unwrap().result;
        assert_eq!(a.sharpe_ratio, b.sharpe_ratio);
        assert_eq!(a.expected_volatility, b.expected_volatility);
    }

    #[test]
    fn test_injected_sequence_is_deterministic() {
        let inp = OptimizeInput {
            assets: vec![
                asset("A", AssetClass::Stock, 0.10, 0.12),
                asset("B", AssetClass::Stock, 0.10, 0.12),
            ],
            risk_profile: RiskProfile::Moderate,
            iterations: 1,
            risk_free_rate: 0.0,
            seed: None,
            time_budget_ms: None,
        };
        // Single draw of (0.25, 0.75) normalizes to itself
        let mut seq = FixedSequence::new(vec![0.25, 0.75]);
        let out = optimize_portfolio_with(&inp, &mut seq, &SearchControl::unbounded())
            .unwrap()
            .result;
        assert!(!out.used_fallback);
        assert!((out.allocations[0].weight - 0.25).abs() < 1e-12);
        assert!((out.allocations[1].weight - 0.75).abs() < 1e-12);
    }

    #[test]
    fn test_single_asset_is_fully_weighted() {
        let inp = OptimizeInput {
            assets: vec![asset("SPY", AssetClass::Stock, 0.1, 0.13)],
            ..input(RiskProfile::Moderate)
        };
        let out = optimize_portfolio(&inp).unwrap().result;
        assert!((out.allocations[0].weight - 1.0).abs() < 1e-12);
        assert_eq!(out.diversification_score, 0.0);
    }

    #[test]
    fn test_cancelled_search_still_returns_portfolio() {
        let control = SearchControl::unbounded().with_deadline(std::time::Duration::ZERO);
        let mut rng = rng_from_seed(Some(SEED));
        let result = optimize_portfolio_with(&input(RiskProfile::Moderate), &mut rng, &control)
            .unwrap();
        assert_eq!(result.result.trials_run, 0);
        assert!(result.result.used_fallback);
        let total: f64 = result.result.allocations.iter().map(|a| a.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_zero_iterations_rejected() {
        let mut inp = input(RiskProfile::Moderate);
        inp.iterations = 0;
        assert!(optimize_portfolio(&inp).is_err());
    }

    #[test]
    fn test_empty_assets_rejected() {
        let mut inp = input(RiskProfile::Moderate);
        inp.assets.clear();
        assert!(optimize_portfolio(&inp).is_err());
    }

    #[test]
    fn test_non_finite_return_rejected() {
        let mut inp = input(RiskProfile::Moderate);
        inp.assets[0].expected_return = f64::INFINITY;
        assert!(optimize_portfolio(&inp).is_err());
    }

    #[test]
    fn test_defaults_from_json() {
        let json = r#"{"assets": [{"symbol": "SPY", "asset_class": "stock",
            "expected_return": 0.1, "volatility": 0.15, "current_price": 400.0}]}"#;
        let inp: OptimizeInput = serde_json::from_str(json).unwrap();
        assert_eq!(inp.iterations, 10_000);
        assert_eq!(inp.risk_profile, RiskProfile::Moderate);
        assert_eq!(inp.risk_free_rate, 0.045);
    }
}
