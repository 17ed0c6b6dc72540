use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::config::TRADING_DAYS_PER_YEAR;
use crate::error::PortfolioRiskError;
use crate::sampling::stats::{mean, std_dev};
use crate::types::{ensure_finite, with_metadata_f64, ComputationOutput};
use crate::PortfolioRiskResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceInput {
    /// Portfolio value at the end of each period, oldest first
    pub equity_curve: Vec<f64>,
    #[serde(default = "default_periods_per_year")]
    pub periods_per_year: f64,
    /// Annualized
    #[serde(default)]
    pub risk_free_rate: f64,
}

fn default_periods_per_year() -> f64 {
    TRADING_DAYS_PER_YEAR
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub observations: usize,
    pub total_return: f64,
    /// Compound annual growth rate over the whole curve
    pub annualized_return: f64,
    pub annualized_volatility: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    /// Annualized return / max drawdown; None without a drawdown
    pub calmar_ratio: Option<f64>,
    /// Largest peak-to-trough decline as a fraction of the peak
    pub max_drawdown: f64,
    /// Longest run of periods spent below a prior peak
    pub max_drawdown_duration: usize,
    pub best_period_return: f64,
    pub worst_period_return: f64,
    /// Share of periods with a positive return
    pub win_rate: f64,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn calculate_performance_metrics(
    input: &PerformanceInput,
) -> PortfolioRiskResult<ComputationOutput<PerformanceMetrics>> {
    let start = Instant::now();
    let warnings: Vec<String> = Vec::new();

    validate(input)?;

    let curve = &input.equity_curve;
    let periods = input.periods_per_year;
    let returns: Vec<f64> = curve.windows(2).map(|w| w[1] / w[0] - 1.0).collect();
    let n = returns.len();

    let first = curve[0];
    let last = curve[curve.len() - 1];
    let total_return = last / first - 1.0;
    let annualized_return = (last / first).powf(periods / n as f64) - 1.0;

    let mean_return = mean(&returns);
    let period_std = std_dev(&returns);
    let annualized_volatility = period_std * periods.sqrt();

    // Sharpe = (mean * P - rf) / (std * sqrt(P))
    let excess = mean_return * periods - input.risk_free_rate;
    let sharpe_ratio = if annualized_volatility.abs() < f64::EPSILON {
        0.0
    } else {
        excess / annualized_volatility
    };

    let downside = downside_deviation(&returns, input.risk_free_rate / periods) * periods.sqrt();
    let sortino_ratio = if downside.abs() < f64::EPSILON {
        0.0
    } else {
        excess / downside
    };

    let (max_drawdown, max_drawdown_duration) = drawdown(curve);
    let calmar_ratio = if max_drawdown > 0.0 {
        Some(annualized_return / max_drawdown)
    } else {
        None
    };

    let best_period_return = returns.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let worst_period_return = returns.iter().copied().fold(f64::INFINITY, f64::min);
    let win_rate = returns.iter().filter(|r| **r > 0.0).count() as f64 / n as f64;

    let output = PerformanceMetrics {
        observations: curve.len(),
        total_return,
        annualized_return,
        annualized_volatility,
        sharpe_ratio,
        sortino_ratio,
        calmar_ratio,
        max_drawdown,
        max_drawdown_duration,
        best_period_return,
        worst_period_return,
        win_rate,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Equity Curve Performance (Sharpe, Sortino, Calmar, drawdown)",
        &serde_json::json!({
            "periods_per_year": periods,
            "risk_free_rate": input.risk_free_rate,
            "volatility": "population standard deviation of period returns",
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Root mean square of shortfalls below `target` over all periods.
fn downside_deviation(returns: &[f64], target: f64) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = returns
        .iter()
        .map(|r| (r - target).min(0.0).powi(2))
        .sum();
    (sum_sq / returns.len() as f64).sqrt()
}

/// (max drawdown fraction, longest underwater stretch in periods)
fn drawdown(curve: &[f64]) -> (f64, usize) {
    let mut peak = f64::NEG_INFINITY;
    let mut max_dd = 0.0_f64;
    let mut underwater = 0usize;
    let mut longest = 0usize;
    for &v in curve {
        if v >= peak {
            peak = v;
            underwater = 0;
        } else {
            underwater += 1;
            longest = longest.max(underwater);
            max_dd = max_dd.max((peak - v) / peak);
        }
    }
    (max_dd, longest)
}

fn validate(input: &PerformanceInput) -> PortfolioRiskResult<()> {
    if input.equity_curve.len() < 2 {
        return Err(PortfolioRiskError::InsufficientData(
            "At least 2 equity curve points required".into(),
        ));
    }
    for v in &input.equity_curve {
        ensure_finite("equity_curve", *v)?;
        if *v <= 0.0 {
            return Err(PortfolioRiskError::invalid(
                "equity_curve",
                "Values must be positive",
            ));
        }
    }
    ensure_finite("periods_per_year", input.periods_per_year)?;
    if input.periods_per_year <= 0.0 {
        return Err(PortfolioRiskError::invalid(
            "periods_per_year",
            "Must be positive",
        ));
    }
    ensure_finite("risk_free_rate", input.risk_free_rate)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(curve: Vec<f64>) -> PerformanceInput {
        PerformanceInput {
            equity_curve: curve,
            periods_per_year: 252.0,
            risk_free_rate: 0.0,
        }
    }

    #[test]
    fn test_total_and_annualized_return() {
        let inp = PerformanceInput {
            periods_per_year: 1.0,
            ..input(vec![100.0, 110.0, 121.0])
        };
        let out = calculate_performance_metrics(&inp).unwrap().result;
        assert!((out.total_return - 0.21).abs() < 1e-12);
        assert!((out.annualized_return - 0.10).abs() < 1e-12);
        assert!(out.annualized_volatility.abs() < 1e-12);
        // Zero volatility guards the ratio
        assert_eq!(out.sharpe_ratio, 0.0);
        assert_eq!(out.win_rate, 1.0);
    }

    #[test]
    fn test_max_drawdown_and_duration() {
        let out = calculate_performance_metrics(&input(vec![
            100.0, 120.0, 90.0, 96.0, 110.0, 130.0, 125.0,
        ]))
        .unwrap()
        .result;
        assert!((out.max_drawdown - 0.25).abs() < 1e-12);
        assert_eq!(out.max_drawdown_duration, 3);
        assert!(out.calmar_ratio.is_some());
    }

    #[test]
    fn test_monotone_curve_has_no_drawdown() {
        let out = calculate_performance_metrics(&input(vec![100.0, 101.0, 103.0, 104.0]))
            .unwrap()
            .result;
        assert_eq!(out.max_drawdown, 0.0);
        assert_eq!(out.max_drawdown_duration, 0);
        assert!(out.calmar_ratio.is_none());
        assert_eq!(out.sortino_ratio, 0.0);
        assert!(out.sharpe_ratio > 0.0);
    }

    #[test]
    fn test_sharpe_sign_follows_excess_return() {
        let out = calculate_performance_metrics(&input(vec![100.0, 98.0, 99.0, 95.0, 96.0]))
            .unwrap()
            .result;
        assert!(out.sharpe_ratio < 0.0);
        assert!(out.sortino_ratio < 0.0);
        assert!(out.worst_period_return < 0.0);
    }

    #[test]
    fn test_insufficient_data() {
        let err = calculate_performance_metrics(&input(vec![100.0])).unwrap_err();
        assert!(matches!(err, PortfolioRiskError::InsufficientData(_)));
    }

    #[test]
    fn test_non_positive_values_rejected() {
        assert!(calculate_performance_metrics(&input(vec![100.0, 0.0])).is_err());
        assert!(calculate_performance_metrics(&input(vec![100.0, f64::NAN])).is_err());
    }
}
