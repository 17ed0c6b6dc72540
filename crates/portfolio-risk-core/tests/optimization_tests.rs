#![cfg(feature = "optimization")]

use portfolio_risk_core::optimization::covariance::build_covariance_matrix;
use portfolio_risk_core::optimization::frontier::{generate_efficient_frontier, FrontierInput};
use portfolio_risk_core::optimization::metrics::{calculate_portfolio_return, calculate_sharpe_ratio};
use portfolio_risk_core::optimization::search::{optimize_portfolio, OptimizeInput, RiskProfile};
use portfolio_risk_core::{AssetClass, AssetProfile};
use pretty_assertions::assert_eq;

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

fn universe() -> Vec<AssetProfile> {
    vec![
        asset("SPY", AssetClass::Stock, 0.10, 0.18),
        asset("QQQ", AssetClass::Stock, 0.12, 0.24),
        asset("TLT", AssetClass::Bond, 0.04, 0.08),
        asset("GLD", AssetClass::Commodity, 0.06, 0.16),
        asset("BTC", AssetClass::Crypto, 0.35, 0.70),
    ]
}

// ===========================================================================
// Optimizer
// ===========================================================================

#[test]
fn test_weights_sum_to_one_for_every_profile() {
    for profile in [
        RiskProfile::Conservative,
        RiskProfile::ModeratelyConservative,
        RiskProfile::Moderate,
        RiskProfile::ModeratelyAggressive,
        RiskProfile::Aggressive,
    ] {
        let input = OptimizeInput {
            assets: universe(),
            risk_profile: profile,
            iterations: 2_000,
            risk_free_rate: 0.045,
            seed: Some(11),
            time_budget_ms: None,
        };
        let out = optimize_portfolio(&input).unwrap().result;
        let total: f64 = out.allocations.iter().map(|a| a.weight).sum();
        assert!((total - 1.0).abs() < 0.01, "{profile:?}: {total}");
        assert!(out.allocations.iter().all(|a| a.weight >= 0.0));
        assert!((0.0..=100.0).contains(&out.diversification_score));
    }
}

#[test]
fn test_feasible_result_lies_in_band() {
    let input = OptimizeInput {
        assets: universe(),
        risk_profile: RiskProfile::Moderate,
        iterations: 5_000,
        risk_free_rate: 0.045,
        seed: Some(3),
        time_budget_ms: None,
    };
    let out = optimize_portfolio(&input).unwrap().result;
    assert!(!out.used_fallback);
    let (lo, hi) = out.volatility_band;
    assert!(out.expected_volatility >= lo && out.expected_volatility <= hi);
}

#[test]
fn test_single_asset_outside_band_falls_back() {
    let input = OptimizeInput {
        assets: vec![asset("BTC", AssetClass::Crypto, 0.35, 0.70)],
        risk_profile: RiskProfile::Conservative,
        iterations: 100,
        risk_free_rate: 0.045,
        seed: Some(1),
        time_budget_ms: None,
    };
    let result = optimize_portfolio(&input).unwrap();
    assert!(result.result.used_fallback);
    assert_eq!(result.result.allocations.len(), 1);
    assert!((result.result.allocations[0].weight - 1.0).abs() < 1e-12);
    assert!(!result.warnings.is_empty());
}

#[test]
fn test_seeded_runs_match() {
    let input = OptimizeInput {
        assets: universe(),
        risk_profile: RiskProfile::Aggressive,
        iterations: 1_000,
        risk_free_rate: 0.045,
        seed: Some(99),
        time_budget_ms: None,
    };
    let a = optimize_portfolio(&input).unwrap().result;
    let b = optimize_portfolio(&input).unwrap().result;
    assert_eq!(a.sharpe_ratio, b.sharpe_ratio);
}

// ===========================================================================
// Covariance & metrics
// ===========================================================================

#[test]
fn test_covariance_is_symmetric_with_variance_diagonal() {
    let cov = build_covariance_matrix(&universe()).unwrap();
    assert!(cov.is_symmetric(1e-15));
    assert!((cov.get(0, 0) - 0.18 * 0.18).abs() < 1e-15);
    // stock-bond -0.2
    assert!((cov.get(0, 2) - (-0.2 * 0.18 * 0.08)).abs() < 1e-15);
}

#[test]
fn test_reference_metrics() {
    let r = calculate_portfolio_return(&[0.5, 0.3, 0.2], &[0.10, 0.15, 0.05]);
    assert!((r - 0.105).abs() < 1e-12);
    assert!((calculate_sharpe_ratio(0.12, 0.20, 0.045) - 0.375).abs() < 1e-12);
    assert_eq!(calculate_sharpe_ratio(0.12, 0.0, 0.045), 0.0);
}

// ===========================================================================
// Efficient frontier
// ===========================================================================

#[test]
fn test_frontier_sorted_by_volatility() {
    let input = FrontierInput {
        assets: universe(),
        frontier_points: 10,
        iterations_per_point: 1_000,
        epsilon: 0.01,
        risk_free_rate: 0.045,
        seed: Some(5),
        time_budget_ms: None,
    };
    let out = generate_efficient_frontier(&input).unwrap().result;
    assert!(!out.points.is_empty());
    assert!(out.points.len() <= 10);
    for w in out.points.windows(2) {
        assert!(w[0].volatility <= w[1].volatility);
    }
    for p in &out.points {
        let total: f64 = p.allocations.iter().map(|a| a.weight).sum();
        assert!((total - 1.0).abs() < 0.01);
    }
}
