use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Annual risk-free rate used when an input does not specify one.
pub const DEFAULT_RISK_FREE_RATE: f64 = 0.045;
/// Trading days per year for daily/annual scaling.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;
pub const DEFAULT_OPTIMIZER_ITERATIONS: u32 = 10_000;
pub const DEFAULT_FRONTIER_POINTS: u32 = 20;
pub const DEFAULT_FRONTIER_ITERATIONS: u32 = 2_000;
pub const DEFAULT_FRONTIER_EPSILON: f64 = 0.005;
pub const DEFAULT_NUM_SIMULATIONS: u32 = 10_000;
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;
pub const DEFAULT_HISTORY_RETENTION: usize = 1_000;

/// Engine-wide defaults that callers can override from a JSON file.
///
/// Field names match the input fields they default, so the config can be
/// overlaid onto any operation's JSON input (see [`EngineConfig::overlay`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub risk_free_rate: f64,
    pub iterations: u32,
    pub frontier_points: u32,
    pub iterations_per_point: u32,
    pub num_simulations: u32,
    pub confidence_level: f64,
    pub seed: Option<u64>,
    pub time_budget_ms: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            risk_free_rate: DEFAULT_RISK_FREE_RATE,
            iterations: DEFAULT_OPTIMIZER_ITERATIONS,
            frontier_points: DEFAULT_FRONTIER_POINTS,
            iterations_per_point: DEFAULT_FRONTIER_ITERATIONS,
            num_simulations: DEFAULT_NUM_SIMULATIONS,
            confidence_level: DEFAULT_CONFIDENCE_LEVEL,
            seed: None,
            time_budget_ms: None,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON text. Missing keys take their defaults.
    pub fn from_json(text: &str) -> crate::PortfolioRiskResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Fill keys missing from a JSON input object with this config's values.
    /// Keys already present in the input always win; `null` options are skipped.
    pub fn overlay(&self, input: &mut Value) {
        let Value::Object(target) = input else {
            return;
        };
        let Ok(Value::Object(defaults)) = serde_json::to_value(self) else {
            return;
        };
        for (key, val) in defaults {
            if val.is_null() {
                continue;
            }
            target.entry(key).or_insert(val);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.iterations, 10_000);
        assert_eq!(cfg.risk_free_rate, 0.045);
        assert!(cfg.seed.is_none());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let cfg = EngineConfig::from_json(r#"{"seed": 7, "iterations": 500}"#).unwrap();
        assert_eq!(cfg.seed, Some(7));
        assert_eq!(cfg.iterations, 500);
        assert_eq!(cfg.num_simulations, DEFAULT_NUM_SIMULATIONS);
    }

    #[test]
    fn test_overlay_fills_only_missing_keys() {
        let cfg = EngineConfig {
            seed: Some(42),
            ..EngineConfig::default()
        };
        let mut input = json!({"iterations": 10, "assets": []});
        cfg.overlay(&mut input);
        assert_eq!(input["iterations"], json!(10));
        assert_eq!(input["seed"], json!(42));
        assert_eq!(input["risk_free_rate"], json!(0.045));
        assert!(input.get("time_budget_ms").is_none());
    }

    #[test]
    fn test_overlay_ignores_non_objects() {
        let mut input = json!([1, 2, 3]);
        EngineConfig::default().overlay(&mut input);
        assert_eq!(input, json!([1, 2, 3]));
    }
}
