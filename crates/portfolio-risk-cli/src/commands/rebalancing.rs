use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde_json::Value;

use portfolio_risk_core::config::EngineConfig;
use portfolio_risk_core::rebalancing::rebalancer::{
    calculate_rebalancing, weights_from_holdings, RebalancingInput,
};
use portfolio_risk_core::Holding;

use super::{CommandResult, InputArgs};
use crate::input;

/// Accepts either explicit `current` weights or raw `holdings`, from which
/// current weights and the portfolio value are derived.
pub fn run_rebalance(args: InputArgs, config: Option<&EngineConfig>) -> CommandResult {
    let mut value = input::load_value(args.input.as_deref(), config, "rebalancing")?;

    if let Value::Object(map) = &mut value {
        if let Some(raw) = map.remove("holdings") {
            let holdings: Vec<Holding> = serde_json::from_value(raw)?;
            let current = weights_from_holdings(&holdings)?;
            map.insert("current".into(), serde_json::to_value(current)?);

            if !map.contains_key("portfolio_value") {
                let total: f64 = holdings.iter().map(Holding::market_value).sum();
                if let Some(pv) = Decimal::from_f64(total) {
                    map.insert("portfolio_value".into(), serde_json::to_value(pv)?);
                }
            }
        }
    }

    let rebal_input: RebalancingInput = serde_json::from_value(value)
        .map_err(|e| format!("Invalid rebalancing input: {e}"))?;
    let result = calculate_rebalancing(&rebal_input)?;
    Ok(serde_json::to_value(result)?)
}
