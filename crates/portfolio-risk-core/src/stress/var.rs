use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::time::Instant;

use crate::config::{DEFAULT_CONFIDENCE_LEVEL, TRADING_DAYS_PER_YEAR};
use crate::error::PortfolioRiskError;
use crate::optimization::covariance::asset_class_correlation;
use crate::types::{
    ensure_finite, validate_holdings, with_metadata_f64, ComputationOutput, Holding,
};
use crate::PortfolioRiskResult;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParametricVarInput {
    pub holdings: Vec<Holding>,
    #[serde(default = "default_confidence_level")]
    pub confidence_level: f64,
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
    /// Use the asset-class correlation table instead of summing
    /// weighted volatilities in quadrature
    #[serde(default)]
    pub include_correlations: bool,
}

fn default_confidence_level() -> f64 {
    DEFAULT_CONFIDENCE_LEVEL
}

fn default_horizon_days() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParametricVarOutput {
    pub portfolio_value: f64,
    /// Annualized
    pub portfolio_volatility: f64,
    pub z_score: f64,
    pub confidence_level: f64,
    pub horizon_days: u32,
    pub value_at_risk: f64,
    pub value_at_risk_percent: f64,
    pub correlation_adjusted: bool,
}

/// Variance-covariance VaR: PV * sigma_p * z(c) * sqrt(h / 252).
pub fn calculate_parametric_var(
    input: &ParametricVarInput,
) -> PortfolioRiskResult<ComputationOutput<ParametricVarOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let portfolio_value = validate_holdings(&input.holdings)?;
    ensure_finite("confidence_level", input.confidence_level)?;
    if input.confidence_level <= 0.0 || input.confidence_level >= 1.0 {
        return Err(PortfolioRiskError::invalid(
            "confidence_level",
            "Must be in (0, 1)",
        ));
    }
    if input.horizon_days == 0 {
        return Err(PortfolioRiskError::invalid(
            "horizon_days",
            "Must be at least 1",
        ));
    }

    let scaled: Vec<(f64, &Holding)> = input
        .holdings
        .iter()
        .map(|h| (h.market_value() / portfolio_value * h.effective_volatility(), h))
        .collect();

    let variance: f64 = if input.include_correlations {
        let mut v = 0.0;
        for (i, (si, hi)) in scaled.iter().enumerate() {
            for (j, (sj, hj)) in scaled.iter().enumerate() {
                let rho = if i == j {
                    1.0
                } else {
                    asset_class_correlation(hi.asset_class, hj.asset_class)
                };
                v += si * sj * rho;
            }
        }
        v
    } else {
        warnings.push(
            "Correlations ignored: holdings treated as independent, which understates risk for positively correlated assets".into(),
        );
        scaled.iter().map(|(s, _)| s * s).sum()
    };
    let portfolio_volatility = variance.max(0.0).sqrt();

    let normal = Normal::new(0.0, 1.0).map_err(|e| PortfolioRiskError::InvalidInput {
        field: "distribution".into(),
        reason: format!("Invalid Normal parameters: {e}"),
    })?;
    let z_score = normal.inverse_cdf(input.confidence_level);

    let horizon_scale = (input.horizon_days as f64 / TRADING_DAYS_PER_YEAR).sqrt();
    let value_at_risk = portfolio_value * portfolio_volatility * z_score * horizon_scale;

    tracing::debug!(
        var = value_at_risk,
        sigma = portfolio_volatility,
        correlated = input.include_correlations,
        "parametric VaR computed"
    );

    let output = ParametricVarOutput {
        portfolio_value,
        portfolio_volatility,
        z_score,
        confidence_level: input.confidence_level,
        horizon_days: input.horizon_days,
        value_at_risk,
        value_at_risk_percent: value_at_risk / portfolio_value * 100.0,
        correlation_adjusted: input.include_correlations,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Parametric (Variance-Covariance) Value at Risk",
        &serde_json::json!({
            "distribution": "normal",
            "horizon_scaling": "square root of time",
            "trading_days_per_year": TRADING_DAYS_PER_YEAR,
            "correlation_model": if input.include_correlations { "asset_class_table" } else { "independent" },
        }),
        warnings,
        elapsed,
        output,
    ))
}
