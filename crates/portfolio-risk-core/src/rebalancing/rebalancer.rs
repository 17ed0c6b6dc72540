//! Drift-based rebalancing.
//!
//! Compares current and target weights symbol by symbol and proposes a
//! trade wherever the gap reaches the threshold. Symbols held but absent
//! from the target are sold in full. Weights, values and quantities use
//! `rust_decimal::Decimal`.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::time::Instant;

use crate::error::PortfolioRiskError;
use crate::types::{with_metadata, ComputationOutput, Holding, Money};
use crate::PortfolioRiskResult;

const QUANTITY_DP: u32 = 8;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightEntry {
    pub symbol: String,
    pub weight: Decimal,
    /// Per-unit price; enables quantity sizing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<Money>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalancingInput {
    pub current: Vec<WeightEntry>,
    pub target: Vec<WeightEntry>,
    /// Minimum absolute drift that triggers a trade
    #[serde(default = "default_threshold")]
    pub threshold: Decimal,
    /// Turns weight drift into trade notionals when present
    #[serde(default)]
    pub portfolio_value: Option<Money>,
    /// Round-trip cost in basis points applied to traded notional
    #[serde(default)]
    pub transaction_cost_bps: Option<Decimal>,
}

fn default_threshold() -> Decimal {
    dec!(0.05)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalancingRecommendation {
    pub symbol: String,
    pub action: TradeAction,
    pub current_weight: Decimal,
    pub target_weight: Decimal,
    /// target - current
    pub drift: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_value: Option<Money>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_quantity: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RebalancingOutput {
    pub recommendations: Vec<RebalancingRecommendation>,
    /// Sum of traded |drift| / 2
    pub total_turnover: Decimal,
    pub positions_rebalanced: u32,
    pub positions_unchanged: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_transaction_cost: Option<Money>,
}

// ---------------------------------------------------------------------------
// Calculation
// ---------------------------------------------------------------------------

pub fn calculate_rebalancing(
    input: &RebalancingInput,
) -> PortfolioRiskResult<ComputationOutput<RebalancingOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    validate(input)?;

    for (label, entries) in [("current", &input.current), ("target", &input.target)] {
        if entries.is_empty() {
            continue;
        }
        let sum: Decimal = entries.iter().map(|e| e.weight).sum();
        if (sum - Decimal::ONE).abs() > dec!(0.01) {
            warnings.push(format!("{label} weights sum to {sum}, not 1"));
        }
    }

    let (current, merged) = merge_lots(&input.current)?;
    if merged > 0 {
        warnings.push(format!(
            "{merged} duplicate current entries merged into their symbol's position"
        ));
    }
    let targeted: HashSet<&str> = input.target.iter().map(|e| e.symbol.as_str()).collect();

    let mut recommendations: Vec<RebalancingRecommendation> = Vec::new();
    let mut positions_unchanged: u32 = 0;

    for t in &input.target {
        let held = current.get(t.symbol.as_str());
        let current_weight = held.map(|p| p.weight).unwrap_or(Decimal::ZERO);
        let drift = t.weight - current_weight;

        if drift.abs() < input.threshold {
            positions_unchanged += 1;
            continue;
        }
        let price = t.price.or_else(|| held.and_then(|p| p.price));
        recommendations.push(recommend(
            &t.symbol,
            current_weight,
            t.weight,
            price,
            input.portfolio_value,
        )?);
    }

    // Held positions with no target are closed out
    for (symbol, held) in &current {
        if targeted.contains(symbol) || held.weight.is_zero() {
            continue;
        }
        recommendations.push(recommend(
            symbol,
            held.weight,
            Decimal::ZERO,
            held.price,
            input.portfolio_value,
        )?);
    }

    recommendations.sort_by(|a, b| {
        b.drift
            .abs()
            .cmp(&a.drift.abs())
            .then_with(|| a.symbol.cmp(&b.symbol))
    });

    let traded: Decimal = recommendations.iter().map(|r| r.drift.abs()).sum();
    let total_turnover = traded / dec!(2);
    let estimated_transaction_cost = match (input.portfolio_value, input.transaction_cost_bps) {
        (Some(pv), Some(bps)) => Some(
            total_turnover
                .checked_mul(pv)
                .and_then(|v| v.checked_mul(bps))
                .map(|v| v / dec!(10000))
                .ok_or_else(|| {
                    PortfolioRiskError::invalid(
                        "transaction_cost_bps",
                        "Transaction cost overflows decimal range",
                    )
                })?,
        ),
        _ => None,
    };

    tracing::debug!(
        trades = recommendations.len(),
        unchanged = positions_unchanged,
        turnover = %total_turnover,
        "rebalancing computed"
    );

    let output = RebalancingOutput {
        positions_rebalanced: recommendations.len() as u32,
        positions_unchanged,
        recommendations,
        total_turnover,
        estimated_transaction_cost,
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata(
        "Threshold Drift Rebalancing",
        &serde_json::json!({
            "threshold": input.threshold.to_string(),
            "trigger": "|target - current| >= threshold",
            "untargeted_holdings": "sold in full",
        }),
        warnings,
        elapsed,
        output,
    ))
}

/// Current weights by market value. Lots of the same symbol are combined
/// into one entry priced at their value-weighted average.
pub fn weights_from_holdings(holdings: &[Holding]) -> PortfolioRiskResult<Vec<WeightEntry>> {
    if holdings.is_empty() {
        return Err(PortfolioRiskError::invalid(
            "holdings",
            "Portfolio must contain at least one holding",
        ));
    }

    // symbol -> (quantity, value), first-seen order
    let mut order: Vec<&str> = Vec::new();
    let mut positions: HashMap<&str, (Decimal, Money)> = HashMap::new();
    for h in holdings {
        let price = to_decimal("current_price", h.current_price)?;
        let qty = to_decimal("quantity", h.quantity)?;
        let value = qty
            .checked_mul(price)
            .ok_or_else(|| PortfolioRiskError::invalid("quantity", overflow(&h.symbol)))?;
        let entry = positions.entry(h.symbol.as_str()).or_insert_with(|| {
            order.push(h.symbol.as_str());
            (Decimal::ZERO, Decimal::ZERO)
        });
        entry.0 = entry
            .0
            .checked_add(qty)
            .ok_or_else(|| PortfolioRiskError::invalid("quantity", overflow(&h.symbol)))?;
        entry.1 = entry
            .1
            .checked_add(value)
            .ok_or_else(|| PortfolioRiskError::invalid("quantity", overflow(&h.symbol)))?;
    }

    let mut total = Decimal::ZERO;
    for (_, value) in positions.values() {
        total = total
            .checked_add(*value)
            .ok_or_else(|| {
                PortfolioRiskError::invalid("holdings", "Total market value overflows decimal range")
            })?;
    }
    if total <= Decimal::ZERO {
        return Err(PortfolioRiskError::invalid(
            "holdings",
            "Total market value must be positive",
        ));
    }

    Ok(order
        .into_iter()
        .map(|symbol| {
            let (qty, value) = positions[symbol];
            WeightEntry {
                symbol: symbol.to_string(),
                weight: value / total,
                price: value.checked_div(qty),
            }
        })
        .collect())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Per-symbol current position after merging duplicate entries.
struct HeldPosition {
    weight: Decimal,
    price: Option<Money>,
}

/// Sum current entries per symbol; the first listed price wins.
/// Returns the positions and how many entries were folded into another.
fn merge_lots(entries: &[WeightEntry]) -> PortfolioRiskResult<(BTreeMap<&str, HeldPosition>, usize)> {
    let mut positions: BTreeMap<&str, HeldPosition> = BTreeMap::new();
    let mut merged = 0;
    for e in entries {
        match positions.get_mut(e.symbol.as_str()) {
            Some(held) => {
                merged += 1;
                held.weight = held
                    .weight
                    .checked_add(e.weight)
                    .ok_or_else(|| PortfolioRiskError::invalid("weight", overflow(&e.symbol)))?;
                held.price = held.price.or(e.price);
            }
            None => {
                positions.insert(
                    e.symbol.as_str(),
                    HeldPosition {
                        weight: e.weight,
                        price: e.price,
                    },
                );
            }
        }
    }
    Ok((positions, merged))
}

fn recommend(
    symbol: &str,
    current_weight: Decimal,
    target_weight: Decimal,
    price: Option<Money>,
    portfolio_value: Option<Money>,
) -> PortfolioRiskResult<RebalancingRecommendation> {
    let drift = target_weight - current_weight;
    let trade_value = portfolio_value
        .map(|pv| {
            drift
                .abs()
                .checked_mul(pv)
                .ok_or_else(|| PortfolioRiskError::invalid("portfolio_value", overflow(symbol)))
        })
        .transpose()?;
    let trade_quantity = match (trade_value, price) {
        (Some(v), Some(p)) if p > Decimal::ZERO => Some(
            v.checked_div(p)
                .ok_or_else(|| PortfolioRiskError::invalid("price", overflow(symbol)))?
                .round_dp(QUANTITY_DP),
        ),
        _ => None,
    };
    Ok(RebalancingRecommendation {
        symbol: symbol.to_string(),
        action: if drift > Decimal::ZERO {
            TradeAction::Buy
        } else {
            TradeAction::Sell
        },
        current_weight,
        target_weight,
        drift,
        trade_value,
        trade_quantity,
    })
}

fn overflow(symbol: &str) -> String {
    format!("Trade sizing for {symbol} overflows decimal range")
}

fn to_decimal(field: &str, value: f64) -> PortfolioRiskResult<Decimal> {
    Decimal::from_f64(value)
        .filter(|d| *d >= Decimal::ZERO)
        .ok_or_else(|| PortfolioRiskError::invalid(field, "Must be a finite non-negative number"))
}

fn validate(input: &RebalancingInput) -> PortfolioRiskResult<()> {
    if input.current.is_empty() && input.target.is_empty() {
        return Err(PortfolioRiskError::invalid(
            "target",
            "Current or target weights required",
        ));
    }
    if input.threshold < Decimal::ZERO {
        return Err(PortfolioRiskError::invalid("threshold", "Cannot be negative"));
    }
    for e in input.current.iter().chain(&input.target) {
        if e.symbol.trim().is_empty() {
            return Err(PortfolioRiskError::invalid("symbol", "Symbol cannot be empty"));
        }
        if e.weight < Decimal::ZERO {
            return Err(PortfolioRiskError::invalid(
                "weight",
                format!("Negative weight for {}", e.symbol),
            ));
        }
        if e.weight > Decimal::ONE {
            return Err(PortfolioRiskError::invalid(
                "weight",
                format!("Weight for {} exceeds 1", e.symbol),
            ));
        }
    }
    let mut seen = HashSet::new();
    for e in &input.target {
        if !seen.insert(e.symbol.as_str()) {
            return Err(PortfolioRiskError::invalid(
                "target",
                format!("Duplicate symbol {}", e.symbol),
            ));
        }
    }
    if let Some(pv) = input.portfolio_value {
        if pv <= Decimal::ZERO {
            return Err(PortfolioRiskError::invalid(
                "portfolio_value",
                "Must be positive",
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetClass;

    fn w(symbol: &str, weight: Decimal) -> WeightEntry {
        WeightEntry {
            symbol: symbol.into(),
            weight,
            price: None,
        }
    }

    fn input(current: Vec<WeightEntry>, target: Vec<WeightEntry>) -> RebalancingInput {
        RebalancingInput {
            current,
            target,
            threshold: dec!(0.05),
            portfolio_value: None,
            transaction_cost_bps: None,
        }
    }

    #[test]
    fn test_identical_weights_no_trades() {
        let weights = vec![w("SPY", dec!(0.6)), w("TLT", dec!(0.4))];
        let out = calculate_rebalancing(&input(weights.clone(), weights))
            .unwrap()
            .result;
        assert!(out.recommendations.is_empty());
        assert_eq!(out.positions_unchanged, 2);
        assert_eq!(out.total_turnover, Decimal::ZERO);
    }

    #[test]
    fn test_small_drift_below_threshold() {
        let out = calculate_rebalancing(&input(
            vec![w("SPY", dec!(0.61)), w("TLT", dec!(0.39))],
            vec![w("SPY", dec!(0.60)), w("TLT", dec!(0.40))],
        ))
        .unwrap()
        .result;
        assert!(out.recommendations.is_empty());
    }

    #[test]
    fn test_single_drift_above_threshold() {
        let out = calculate_rebalancing(&input(
            vec![w("SPY", dec!(0.54)), w("TLT", dec!(0.40)), w("GLD", dec!(0.06))],
            vec![w("SPY", dec!(0.60)), w("TLT", dec!(0.40)), w("GLD", dec!(0.06))],
        ))
        .unwrap()
        .result;
        assert_eq!(out.recommendations.len(), 1);
        let r = &out.recommendations[0];
        assert_eq!(r.symbol, "SPY");
        assert_eq!(r.action, TradeAction::Buy);
        assert_eq!(r.drift, dec!(0.06));
    }

    #[test]
    fn test_drift_exactly_at_threshold_trades() {
        let out = calculate_rebalancing(&input(
            vec![w("SPY", dec!(0.55)), w("TLT", dec!(0.45))],
            vec![w("SPY", dec!(0.60)), w("TLT", dec!(0.40))],
        ))
        .unwrap()
        .result;
        assert_eq!(out.recommendations.len(), 2);
        // Equal |drift| falls back to symbol order
        assert_eq!(out.recommendations[0].symbol, "SPY");
        assert_eq!(out.recommendations[1].action, TradeAction::Sell);
    }

    #[test]
    fn test_untargeted_holding_sold_in_full() {
        let mut inp = input(
            vec![w("SPY", dec!(0.5)), w("DOGE", dec!(0.5))],
            vec![w("SPY", dec!(1.0))],
        );
        inp.portfolio_value = Some(dec!(10000));
        inp.current[1].price = Some(dec!(0.25));
        let out = calculate_rebalancing(&inp).unwrap().result;
        assert_eq!(out.recommendations.len(), 2);
        let doge = out
            .recommendations
            .iter()
            .find(|r| r.symbol == "DOGE")
            .unwrap();
        assert_eq!(doge.action, TradeAction::Sell);
        assert_eq!(doge.target_weight, Decimal::ZERO);
        assert_eq!(doge.trade_value, Some(dec!(5000)));
        assert_eq!(doge.trade_quantity, Some(dec!(20000)));
    }

    #[test]
    fn test_sorted_by_abs_drift() {
        let out = calculate_rebalancing(&input(
            vec![w("A", dec!(0.2)), w("B", dec!(0.5)), w("C", dec!(0.3))],
            vec![w("A", dec!(0.3)), w("B", dec!(0.2)), w("C", dec!(0.5))],
        ))
        .unwrap()
        .result;
        let symbols: Vec<&str> = out.recommendations.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["B", "C", "A"]);
        assert_eq!(out.total_turnover, dec!(0.3));
    }

    #[test]
    fn test_transaction_cost() {
        let mut inp = input(
            vec![w("SPY", dec!(0.4)), w("TLT", dec!(0.6))],
            vec![w("SPY", dec!(0.6)), w("TLT", dec!(0.4))],
        );
        inp.portfolio_value = Some(dec!(100000));
        inp.transaction_cost_bps = Some(dec!(10));
        let out = calculate_rebalancing(&inp).unwrap().result;
        // turnover 0.2 * 100k * 10bps
        assert_eq!(out.estimated_transaction_cost, Some(dec!(20)));
    }

    #[test]
    fn test_weight_sum_warning() {
        let result = calculate_rebalancing(&input(
            vec![w("SPY", dec!(0.5))],
            vec![w("SPY", dec!(0.5))],
        ))
        .unwrap();
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_weights_from_holdings() {
        let holdings = vec![
            Holding {
                symbol: "SPY".into(),
                asset_class: AssetClass::Stock,
                quantity: 3.0,
                current_price: 100.0,
                volatility: None,
                beta: None,
            },
            Holding {
                symbol: "TLT".into(),
                asset_class: AssetClass::Bond,
                quantity: 1.0,
                current_price: 100.0,
                volatility: None,
                beta: None,
            },
        ];
        let weights = weights_from_holdings(&holdings).unwrap();
        assert_eq!(weights[0].weight, dec!(0.75));
        assert_eq!(weights[1].weight, dec!(0.25));
        assert_eq!(weights[0].price, Some(dec!(100)));
    }

    #[test]
    fn test_oversized_trade_errors_instead_of_panicking() {
        let mut inp = input(
            vec![w("SHIB", Decimal::ZERO)],
            vec![WeightEntry {
                symbol: "SHIB".into(),
                weight: Decimal::ONE,
                price: Some(dec!(0.00000001)),
            }],
        );
        inp.portfolio_value = Some(Decimal::MAX);
        let err = calculate_rebalancing(&inp).unwrap_err();
        assert!(matches!(err, PortfolioRiskError::InvalidInput { ref field, .. } if field == "price"));
    }

    #[test]
    fn test_oversized_cost_errors() {
        let mut inp = input(
            vec![w("SPY", dec!(0.2)), w("TLT", dec!(0.8))],
            vec![w("SPY", dec!(0.8)), w("TLT", dec!(0.2))],
        );
        inp.portfolio_value = Some(Decimal::MAX / dec!(2));
        inp.transaction_cost_bps = Some(dec!(10000));
        let err = calculate_rebalancing(&inp).unwrap_err();
        assert!(matches!(
            err,
            PortfolioRiskError::InvalidInput { ref field, .. } if field == "transaction_cost_bps"
        ));
    }

    #[test]
    fn test_duplicate_current_lots_are_merged() {
        let result = calculate_rebalancing(&input(
            vec![w("AAPL", dec!(0.30)), w("AAPL", dec!(0.30)), w("TSLA", dec!(0.40))],
            vec![w("TSLA", dec!(1.0))],
        ))
        .unwrap();
        let out = &result.result;
        let aapl: Vec<_> = out
            .recommendations
            .iter()
            .filter(|r| r.symbol == "AAPL")
            .collect();
        assert_eq!(aapl.len(), 1);
        assert_eq!(aapl[0].current_weight, dec!(0.60));
        assert_eq!(aapl[0].drift, dec!(-0.60));
        assert!(result.warnings.iter().any(|w| w.contains("merged")));
    }

    #[test]
    fn test_duplicate_current_lots_count_toward_target() {
        // Two 0.30 lots already meet a 0.60 target
        let out = calculate_rebalancing(&input(
            vec![w("AAPL", dec!(0.30)), w("AAPL", dec!(0.30)), w("TSLA", dec!(0.40))],
            vec![w("AAPL", dec!(0.60)), w("TSLA", dec!(0.40))],
        ))
        .unwrap()
        .result;
        assert!(out.recommendations.is_empty());
    }

    #[test]
    fn test_weights_from_holdings_merges_lots() {
        let lot = |qty: f64, price: f64| Holding {
            symbol: "AAPL".into(),
            asset_class: AssetClass::Stock,
            quantity: qty,
            current_price: price,
            volatility: None,
            beta: None,
        };
        let holdings = vec![
            lot(10.0, 100.0),
            Holding {
                symbol: "TLT".into(),
                asset_class: AssetClass::Bond,
                quantity: 20.0,
                current_price: 100.0,
                volatility: None,
                beta: None,
            },
            lot(10.0, 200.0),
        ];
        let weights = weights_from_holdings(&holdings).unwrap();
        assert_eq!(weights.len(), 2);
        assert_eq!(weights[0].symbol, "AAPL");
        assert_eq!(weights[0].weight, dec!(0.6));
        assert_eq!(weights[0].price, Some(dec!(150)));
        assert_eq!(weights[1].weight, dec!(0.4));
    }

    #[test]
    fn test_validation() {
        let inp = input(vec![], vec![]);
        assert!(calculate_rebalancing(&inp).is_err());
        let inp = input(vec![], vec![w("SPY", dec!(-0.1))]);
        assert!(calculate_rebalancing(&inp).is_err());
        let inp = input(vec![], vec![w("SPY", dec!(0.5)), w("SPY", dec!(0.5))]);
        assert!(calculate_rebalancing(&inp).is_err());
        let inp = input(vec![w("SPY", Decimal::MAX)], vec![w("SPY", dec!(1))]);
        assert!(calculate_rebalancing(&inp).is_err());
        assert!(weights_from_holdings(&[]).is_err());
    }
}
