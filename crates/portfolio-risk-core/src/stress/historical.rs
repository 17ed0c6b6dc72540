use serde::{Deserialize, Serialize};
use std::time::Instant;

use super::report::{
    generate_recommendations, AssetImpact, PercentilePoint, RiskLevel, ScenarioSummary,
    StressMode, StressTestResult, DISTRIBUTION_PERCENTILES,
};
use super::scenarios::{crisis_scenario, CrisisScenario};
use crate::error::PortfolioRiskError;
use crate::types::{validate_holdings, with_metadata_f64, ComputationOutput, Holding};
use crate::PortfolioRiskResult;

/// Loss multipliers paired with [`DISTRIBUTION_PERCENTILES`]; the scenario
/// loss itself sits at the median.
const SEVERITY_MULTIPLIERS: [f64; 9] = [1.5, 1.3, 1.2, 1.1, 1.0, 0.9, 0.8, 0.7, 0.5];
const VAR_MULTIPLIER: f64 = 1.3;
const CVAR_MULTIPLIER: f64 = 1.4;
const REPLAY_CONFIDENCE: f64 = 0.95;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalStressInput {
    pub scenario_id: String,
    pub holdings: Vec<Holding>,
}

/// Replay a crisis from the compiled-in table against the holdings.
pub fn run_historical_scenario(
    scenario_id: &str,
    holdings: &[Holding],
) -> PortfolioRiskResult<ComputationOutput<StressTestResult>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    let scenario = crisis_scenario(scenario_id)
        .ok_or_else(|| PortfolioRiskError::UnknownScenario(scenario_id.to_string()))?;
    let base_value = validate_holdings(holdings)?;

    let losses: Vec<(f64, f64)> = holdings
        .iter()
        .map(|h| {
            let value = h.market_value();
            (value, value * -scenario.shock_for(h.asset_class) / 100.0)
        })
        .collect();
    let total_loss: f64 = losses.iter().map(|(_, l)| l).sum();

    if total_loss < 0.0 {
        warnings.push(format!(
            "Portfolio gains {:.2} under {}; tail figures are reported as negative losses",
            -total_loss, scenario.name
        ));
    }

    let asset_impacts: Vec<AssetImpact> = holdings
        .iter()
        .zip(&losses)
        .map(|(h, &(value, loss))| AssetImpact {
            symbol: h.symbol.clone(),
            asset_class: h.asset_class,
            current_value: value,
            stressed_value: value - loss,
            loss,
            loss_percent: if value > 0.0 { loss / value * 100.0 } else { 0.0 },
            risk_contribution: if total_loss != 0.0 { loss / total_loss } else { 0.0 },
        })
        .collect();

    let loss_percent = total_loss / base_value * 100.0;
    let percentiles = DISTRIBUTION_PERCENTILES
        .iter()
        .zip(SEVERITY_MULTIPLIERS)
        .map(|(&p, m)| PercentilePoint {
            percentile: p,
            value: base_value - total_loss * m,
        })
        .collect();

    let recommendations = generate_recommendations(holdings, &asset_impacts, base_value, loss_percent);

    tracing::debug!(
        scenario = scenario.id,
        loss = total_loss,
        loss_pct = loss_percent,
        "historical replay finished"
    );

    let result = StressTestResult {
        mode: StressMode::Historical,
        portfolio_value: base_value,
        expected_loss: total_loss,
        expected_loss_percent: loss_percent,
        worst_case_value: base_value - total_loss * SEVERITY_MULTIPLIERS[0],
        best_case_value: base_value - total_loss * SEVERITY_MULTIPLIERS[8],
        value_at_risk: total_loss * VAR_MULTIPLIER,
        conditional_var: total_loss * CVAR_MULTIPLIER,
        confidence_level: REPLAY_CONFIDENCE,
        percentiles,
        asset_impacts,
        risk_level: RiskLevel::from_scenario_loss_pct(loss_percent),
        recommendations,
        scenario: Some(summarize(scenario)),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Historical Scenario Replay (per-asset-class crisis shocks)",
        &serde_json::json!({
            "scenario_id": scenario.id,
            "shocks_pct": scenario.shocks,
            "unlisted_class_shock": "stock",
            "severity_multipliers": SEVERITY_MULTIPLIERS,
            "var_multiplier": VAR_MULTIPLIER,
            "cvar_multiplier": CVAR_MULTIPLIER,
        }),
        warnings,
        elapsed,
        result,
    ))
}

fn summarize(scenario: &CrisisScenario) -> ScenarioSummary {
    ScenarioSummary {
        id: scenario.id.to_string(),
        name: scenario.name.to_string(),
        peak_to_trough_pct: scenario.peak_to_trough_pct,
        recovery_days: scenario.recovery_days,
        characteristics: scenario.characteristics.iter().map(|c| c.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetClass;

    fn holding(symbol: &str, class: AssetClass, value: f64) -> Holding {
        Holding {
            symbol: symbol.into(),
            asset_class: class,
            quantity: 1.0,
            current_price: value,
            volatility: None,
            beta: None,
        }
    }

    fn mixed() -> Vec<Holding> {
        vec![
            holding("SPY", AssetClass::Stock, 60_000.0),
            holding("TLT", AssetClass::Bond, 30_000.0),
            holding("GLD", AssetClass::Commodity, 10_000.0),
        ]
    }

    #[test]
    fn test_2008_replay_losses() {
        let out = run_historical_scenario("financial_crisis_2008", &mixed())
            .unwrap()
            .result;
        // 60k * 50% + 30k * -5% + 10k * 35% = 30_000 - 1_500 + 3_500
        assert!((out.expected_loss - 32_000.0).abs() < 1e-9);
        assert!((out.expected_loss_percent - 32.0).abs() < 1e-9);
        assert_eq!(out.risk_level, RiskLevel::High);
        assert!((out.value_at_risk - 32_000.0 * 1.3).abs() < 1e-6);
        assert!((out.conditional_var - 32_000.0 * 1.4).abs() < 1e-6);
        assert!((out.worst_case_value - (100_000.0 - 48_000.0)).abs() < 1e-6);
        assert!((out.best_case_value - (100_000.0 - 16_000.0)).abs() < 1e-6);
        assert_eq!(out.scenario.as_ref().unwrap().id, "financial_crisis_2008");
    }

    #[test]
    fn test_replay_is_deterministic() {
        let a = run_historical_scenario("financial_crisis_2008", &mixed()).unwrap().result;
        let b = run_historical_scenario("financial_crisis_2008", &mixed()).unwrap().result;
        assert_eq!(a.expected_loss, b.expected_loss);
    }

    #[test]
    fn test_unlisted_class_uses_stock_shock() {
        // 2008 lists no crypto shock
        let out = run_historical_scenario(
            "financial_crisis_2008",
            &[holding("BTC", AssetClass::Crypto, 1_000.0)],
        )
        .unwrap()
        .result;
        assert!((out.expected_loss - 500.0).abs() < 1e-9);
        assert!((out.asset_impacts[0].risk_contribution - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_percentiles_ascend_for_losses() {
        let out = run_historical_scenario("covid_crash_2020", &mixed()).unwrap().result;
        for w in out.percentiles.windows(2) {
            assert!(w[0].value <= w[1].value);
        }
        assert!((out.percentiles[4].value - (out.portfolio_value - out.expected_loss)).abs() < 1e-9);
    }

    #[test]
    fn test_bond_only_gain_warns() {
        let result = run_historical_scenario(
            "financial_crisis_2008",
            &[holding("TLT", AssetClass::Bond, 1_000.0)],
        )
        .unwrap();
        assert!(result.result.expected_loss < 0.0);
        assert_eq!(result.result.risk_level, RiskLevel::Low);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn test_unknown_scenario() {
        let err = run_historical_scenario("tulip_mania_1637", &mixed()).unwrap_err();
        assert!(matches!(err, PortfolioRiskError::UnknownScenario(id) if id == "tulip_mania_1637"));
    }
}
