use std::collections::HashSet;

use crate::types::AssetClass;

/// Weighted expected return: sum of w_i * r_i.
pub fn calculate_portfolio_return(weights: &[f64], expected_returns: &[f64]) -> f64 {
    weights
        .iter()
        .zip(expected_returns.iter())
        .map(|(w, r)| w * r)
        .sum()
}

/// (return - rf) / volatility, with a zero-volatility guard.
pub fn calculate_sharpe_ratio(expected_return: f64, volatility: f64, risk_free_rate: f64) -> f64 {
    if volatility.abs() < f64::EPSILON {
        0.0
    } else {
        (expected_return - risk_free_rate) / volatility
    }
}

/// Herfindahl-Hirschman index: sum of squared weights.
pub fn herfindahl_index(weights: &[f64]) -> f64 {
    weights.iter().map(|w| w * w).sum()
}

/// Diversification score in [0, 100].
///
/// 80 points scale with how close the HHI sits to its minimum 1/n (equal
/// weights score the full 80), plus 5 points per distinct asset class
/// beyond the first.
pub fn diversification_score(weights: &[f64], classes: &[AssetClass]) -> f64 {
    let n = weights.len();
    let base = if n < 2 {
        0.0
    } else {
        let hhi = herfindahl_index(weights);
        let min_hhi = 1.0 / n as f64;
        ((1.0 - hhi) / (1.0 - min_hhi)).clamp(0.0, 1.0) * 80.0
    };

    let distinct: HashSet<AssetClass> = classes
        .iter()
        .zip(weights.iter())
        .filter(|(_, w)| **w > 0.0)
        .map(|(c, _)| *c)
        .collect();
    let bonus = distinct.len().saturating_sub(1) as f64 * 5.0;

    (base + bonus).clamp(0.0, 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_portfolio_return_scenario() {
        let r = calculate_portfolio_return(&[0.5, 0.3, 0.2], &[0.10, 0.15, 0.05]);
        assert!((r - 0.105).abs() < 1e-12);
    }

    #[test]
    fn test_sharpe_ratio_scenario() {
        let s = calculate_sharpe_ratio(0.12, 0.20, 0.045);
        assert!((s - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_sharpe_zero_volatility_guard() {
        assert_eq!(calculate_sharpe_ratio(0.5, 0.0, 0.02), 0.0);
        assert_eq!(calculate_sharpe_ratio(-0.3, 0.0, 0.1), 0.0);
    }

    #[test]
    fn test_hhi() {
        assert!((herfindahl_index(&[0.5, 0.5]) - 0.5).abs() < 1e-15);
        assert_eq!(herfindahl_index(&[1.0]), 1.0);
    }

    #[test]
    fn test_diversification_equal_weights_one_class() {
        let s = diversification_score(&[0.25; 4], &[AssetClass::Stock; 4]);
        assert!((s - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_diversification_class_bonus_and_clamp() {
        let classes = AssetClass::ALL;
        let s = diversification_score(&[0.2; 5], &classes);
        assert!((s - 100.0).abs() < 1e-9, "score={s}");
        assert!(s <= 100.0);
    }

    #[test]
    fn test_diversification_single_asset() {
        assert_eq!(diversification_score(&[1.0], &[AssetClass::Bond]), 0.0);
    }

    #[test]
    fn test_diversification_concentrated_is_low() {
        let s = diversification_score(&[0.97, 0.01, 0.01, 0.01], &[AssetClass::Stock; 4]);
        assert!(s < 10.0, "score={s}");
    }
}
