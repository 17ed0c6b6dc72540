use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::types::{AssetClass, Holding};

/// Percentiles reported in every stress distribution.
pub const DISTRIBUTION_PERCENTILES: [f64; 9] = [1.0, 5.0, 10.0, 25.0, 50.0, 75.0, 90.0, 95.0, 99.0];

/// Share of total risk above which a single holding is flagged.
const CONCENTRATION_LIMIT: f64 = 0.30;
const MIN_ASSET_CLASSES: usize = 3;
const DEFENSIVE_LOSS_TRIGGER_PCT: f64 = 15.0;
const BETA_LIMIT: f64 = 1.2;
const HIGH_VOLATILITY: f64 = 0.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StressMode {
    MonteCarlo,
    Historical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl RiskLevel {
    /// Tiers for simulated VaR as a percent of portfolio value.
    pub fn from_simulated_loss_pct(loss_pct: f64) -> Self {
        Self::tier(loss_pct, [5.0, 10.0, 20.0])
    }

    /// Tiers for a replayed crisis loss as a percent of portfolio value.
    pub fn from_scenario_loss_pct(loss_pct: f64) -> Self {
        Self::tier(loss_pct, [10.0, 20.0, 35.0])
    }

    fn tier(loss_pct: f64, [low, moderate, high]: [f64; 3]) -> Self {
        if loss_pct < low {
            RiskLevel::Low
        } else if loss_pct < moderate {
            RiskLevel::Moderate
        } else if loss_pct < high {
            RiskLevel::High
        } else {
            RiskLevel::Extreme
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PercentilePoint {
    pub percentile: f64,
    pub value: f64,
}

/// Stress outcome for one holding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetImpact {
    pub symbol: String,
    pub asset_class: AssetClass,
    pub current_value: f64,
    pub stressed_value: f64,
    /// Positive = loss
    pub loss: f64,
    pub loss_percent: f64,
    /// Share of the portfolio's total loss attributed to this holding
    pub risk_contribution: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioSummary {
    pub id: String,
    pub name: String,
    pub peak_to_trough_pct: f64,
    pub recovery_days: u32,
    pub characteristics: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StressTestResult {
    pub mode: StressMode,
    pub portfolio_value: f64,
    /// Positive = loss
    pub expected_loss: f64,
    pub expected_loss_percent: f64,
    pub worst_case_value: f64,
    pub best_case_value: f64,
    pub value_at_risk: f64,
    pub conditional_var: f64,
    pub confidence_level: f64,
    /// Portfolio value at each of [`DISTRIBUTION_PERCENTILES`]
    pub percentiles: Vec<PercentilePoint>,
    pub asset_impacts: Vec<AssetImpact>,
    pub risk_level: RiskLevel,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scenario: Option<ScenarioSummary>,
}

/// Value-weighted beta of the holdings.
pub fn portfolio_beta(holdings: &[Holding], total_value: f64) -> f64 {
    if total_value <= 0.0 {
        return 0.0;
    }
    holdings
        .iter()
        .map(|h| h.market_value() / total_value * h.effective_beta())
        .sum()
}

/// Heuristic actions from a stress outcome.
pub fn generate_recommendations(
    holdings: &[Holding],
    impacts: &[AssetImpact],
    total_value: f64,
    loss_percent: f64,
) -> Vec<String> {
    let mut recs = Vec::new();

    for imp in impacts {
        if imp.risk_contribution > CONCENTRATION_LIMIT {
            recs.push(format!(
                "Reduce exposure to {}: it contributes {:.1}% of portfolio risk",
                imp.symbol,
                imp.risk_contribution * 100.0
            ));
        }
    }

    let classes: HashSet<AssetClass> = holdings.iter().map(|h| h.asset_class).collect();
    if classes.len() < MIN_ASSET_CLASSES {
        recs.push(format!(
            "Diversify across more asset classes: only {} held",
            classes.len()
        ));
    }

    if loss_percent > DEFENSIVE_LOSS_TRIGGER_PCT && !holdings.iter().any(Holding::is_defensive) {
        recs.push("Add defensive assets such as bonds or gold to cushion drawdowns".into());
    }

    let beta = portfolio_beta(holdings, total_value);
    if beta > BETA_LIMIT {
        recs.push(format!(
            "Portfolio beta of {beta:.2} exceeds {BETA_LIMIT}; consider lower-beta holdings"
        ));
    }

    let volatile = holdings
        .iter()
        .filter(|h| h.effective_volatility() > HIGH_VOLATILITY)
        .count();
    if volatile * 2 > holdings.len() {
        recs.push(format!(
            "{volatile} of {} holdings have volatility above {:.0}%; consider reducing speculative positions",
            holdings.len(),
            HIGH_VOLATILITY * 100.0
        ));
    }

    if recs.is_empty() {
        recs.push("Portfolio shows reasonable resilience under this stress test".into());
    }
    recs
}
