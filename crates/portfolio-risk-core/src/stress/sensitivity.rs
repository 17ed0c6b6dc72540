use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PortfolioRiskError;
use crate::types::{
    ensure_finite, validate_holdings, with_metadata_f64, AssetClass, ComputationOutput, Holding,
};
use crate::PortfolioRiskResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactor {
    Market,
    InterestRate,
    Volatility,
    Currency,
    Inflation,
}

impl RiskFactor {
    pub const ALL: [RiskFactor; 5] = [
        RiskFactor::Market,
        RiskFactor::InterestRate,
        RiskFactor::Volatility,
        RiskFactor::Currency,
        RiskFactor::Inflation,
    ];

    /// Fractional move of an asset class per unit move of the factor.
    pub fn response(self, class: AssetClass) -> f64 {
        use AssetClass::*;
        use RiskFactor::*;
        match (self, class) {
            (Market, Stock) => 1.0,
            (Market, Crypto) => 1.5,
            (Market, Bond) => -0.1,
            (Market, Commodity) => 0.3,
            (Market, Forex) => 0.1,

            (InterestRate, Stock) => -0.3,
            (InterestRate, Crypto) => -0.5,
            (InterestRate, Bond) => -0.8,
            (InterestRate, Commodity) => -0.2,
            (InterestRate, Forex) => 0.4,

            (Volatility, Stock) => -0.4,
            (Volatility, Crypto) => -0.8,
            (Volatility, Bond) => 0.1,
            (Volatility, Commodity) => 0.05,
            (Volatility, Forex) => -0.1,

            (Currency, Stock) => -0.2,
            (Currency, Crypto) => 0.1,
            (Currency, Bond) => -0.1,
            (Currency, Commodity) => -0.3,
            (Currency, Forex) => 1.0,

            (Inflation, Stock) => -0.2,
            (Inflation, Crypto) => 0.2,
            (Inflation, Bond) => -0.6,
            (Inflation, Commodity) => 0.8,
            (Inflation, Forex) => -0.3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityInput {
    pub holdings: Vec<Holding>,
    /// Factors to sweep; all five when omitted
    #[serde(default)]
    pub factors: Option<Vec<RiskFactor>>,
    /// Sweep half-width in percent (20 = -20%..+20%)
    #[serde(default = "default_range_pct")]
    pub range_pct: f64,
    #[serde(default = "default_steps")]
    pub steps: u32,
}

fn default_range_pct() -> f64 {
    20.0
}

fn default_steps() -> u32 {
    9
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityPoint {
    pub change_pct: f64,
    pub portfolio_value: f64,
    pub value_change: f64,
    pub value_change_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FactorSensitivity {
    pub factor: RiskFactor,
    /// Portfolio % change per 1% factor change
    pub elasticity: f64,
    pub points: Vec<SensitivityPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SensitivityOutput {
    pub portfolio_value: f64,
    pub factors: Vec<FactorSensitivity>,
    /// Factor with the largest absolute elasticity
    pub most_sensitive_factor: Option<RiskFactor>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Sweep each factor across a symmetric range and revalue the holdings
/// with the per-class response table.
pub fn run_sensitivity_analysis(
    input: &SensitivityInput,
) -> PortfolioRiskResult<ComputationOutput<SensitivityOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let base_value = validate_holdings(&input.holdings)?;
    ensure_finite("range_pct", input.range_pct)?;
    if input.range_pct <= 0.0 {
        return Err(PortfolioRiskError::invalid("range_pct", "Must be positive"));
    }
    if input.steps < 2 {
        return Err(PortfolioRiskError::invalid("steps", "Must be at least 2"));
    }
    let factors: Vec<RiskFactor> = match &input.factors {
        Some(f) if f.is_empty() => {
            return Err(PortfolioRiskError::invalid(
                "factors",
                "At least one factor required when provided",
            ))
        }
        Some(f) => f.clone(),
        None => RiskFactor::ALL.to_vec(),
    };

    let step_size = 2.0 * input.range_pct / (input.steps - 1) as f64;
    let mut floored = false;

    let results: Vec<FactorSensitivity> = factors
        .iter()
        .map(|&factor| {
            let points = (0..input.steps)
                .map(|k| {
                    let change_pct = -input.range_pct + k as f64 * step_size;
                    let (value, hit_floor) = revalue(&input.holdings, factor, change_pct);
                    floored |= hit_floor;
                    let value_change = value - base_value;
                    SensitivityPoint {
                        change_pct,
                        portfolio_value: value,
                        value_change,
                        value_change_pct: value_change / base_value * 100.0,
                    }
                })
                .collect();
            FactorSensitivity {
                factor,
                elasticity: elasticity(&input.holdings, base_value, factor),
                points,
            }
        })
        .collect();

    if floored {
        warnings.push(
            "Some holdings were floored at zero value at the extremes of the sweep".into(),
        );
    }

    let most_sensitive_factor = results
        .iter()
        .max_by(|a, b| a.elasticity.abs().total_cmp(&b.elasticity.abs()))
        .map(|f| f.factor);

    tracing::debug!(
        factors = results.len(),
        steps = input.steps,
        "sensitivity sweep finished"
    );

    let output = SensitivityOutput {
        portfolio_value: base_value,
        factors: results,
        most_sensitive_factor,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Factor Sensitivity Sweep (linear per-asset-class responses)",
        &serde_json::json!({
            "range_pct": input.range_pct,
            "steps": input.steps,
            "response_model": "asset value * (1 + response * factor_change)",
        }),
        warnings,
        elapsed,
        output,
    ))
}

fn revalue(holdings: &[Holding], factor: RiskFactor, change_pct: f64) -> (f64, bool) {
    let mut floored = false;
    let value = holdings
        .iter()
        .map(|h| {
            let v = h.market_value() * (1.0 + factor.response(h.asset_class) * change_pct / 100.0);
            if v < 0.0 {
                floored = true;
                0.0
            } else {
                v
            }
        })
        .sum();
    (value, floored)
}

/// Value-weighted response; exact for the linear model away from the floor.
fn elasticity(holdings: &[Holding], total_value: f64, factor: RiskFactor) -> f64 {
    holdings
        .iter()
        .map(|h| h.market_value() / total_value * factor.response(h.asset_class))
        .sum()
}
