use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::error::PortfolioRiskError;
use crate::types::{with_metadata_f64, ComputationOutput};
use crate::PortfolioRiskResult;

use super::history::{simple_returns, AssetKey, LookbackPeriod, PriceHistoryRepository};
use super::pearson::{common_tail, pearson_correlation, CorrelationStrength};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrixInput {
    pub assets: Vec<AssetKey>,
    #[serde(default)]
    pub period: LookbackPeriod,
    /// End of the lookback window (default: now)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub as_of: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationPair {
    pub asset_a: String,
    pub asset_b: String,
    pub correlation: f64,
    pub strength: CorrelationStrength,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorrelationMatrixOutput {
    pub symbols: Vec<String>,
    /// matrix[i][j] = correlation of symbols[i] and symbols[j]
    pub matrix: Vec<Vec<f64>>,
    pub pairs: Vec<CorrelationPair>,
    pub strongest_positive: Option<CorrelationPair>,
    pub strongest_negative: Option<CorrelationPair>,
    /// n * (n - 1) / 2
    pub pair_count: usize,
    pub average_correlation: f64,
    /// Return observations available per asset inside the window
    pub observations: Vec<usize>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Pairwise return correlations over a lookback window of cached prices.
///
/// Diagonal entries are exactly 1. Pairs without enough overlapping
/// history correlate at 0.
pub fn calculate_correlation_matrix(
    input: &CorrelationMatrixInput,
    history: &dyn PriceHistoryRepository,
) -> PortfolioRiskResult<ComputationOutput<CorrelationMatrixOutput>> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if input.assets.is_empty() {
        return Err(PortfolioRiskError::invalid(
            "assets",
            "At least one asset required",
        ));
    }

    let as_of = input.as_of.unwrap_or_else(Utc::now);
    let since = as_of - input.period.duration();

    let returns: Vec<Vec<f64>> = input
        .assets
        .iter()
        .map(|key| {
            let window: Vec<_> = history
                .samples_since(key, since)
                .into_iter()
                .filter(|s| s.timestamp <= as_of)
                .collect();
            simple_returns(&window)
        })
        .collect();

    for (key, r) in input.assets.iter().zip(returns.iter()) {
        if r.len() < 2 {
            warnings.push(format!(
                "{} has {} return observations in window; correlations default to 0",
                key.symbol,
                r.len()
            ));
        }
    }

    let n = input.assets.len();
    let mut matrix = vec![vec![0.0; n]; n];
    let mut pairs: Vec<CorrelationPair> = Vec::with_capacity(n * n.saturating_sub(1) / 2);

    for i in 0..n {
        matrix[i][i] = 1.0;
        for j in (i + 1)..n {
            let (a, b) = common_tail(&returns[i], &returns[j]);
            let r = pearson_correlation(a, b);
            matrix[i][j] = r;
            matrix[j][i] = r;
            pairs.push(CorrelationPair {
                asset_a: input.assets[i].symbol.clone(),
                asset_b: input.assets[j].symbol.clone(),
                correlation: r,
                strength: CorrelationStrength::classify(r),
            });
        }
    }

    let strongest_positive = pairs
        .iter()
        .filter(|p| p.correlation > 0.0)
        .max_by(|a, b| a.correlation.total_cmp(&b.correlation))
        .cloned();
    let strongest_negative = pairs
        .iter()
        .filter(|p| p.correlation < 0.0)
        .min_by(|a, b| a.correlation.total_cmp(&b.correlation))
        .cloned();

    let pair_count = pairs.len();
    let average_correlation = if pair_count == 0 {
        0.0
    } else {
        pairs.iter().map(|p| p.correlation).sum::<f64>() / pair_count as f64
    };

    tracing::debug!(assets = n, pair_count, "correlation matrix built");

    let output = CorrelationMatrixOutput {
        symbols: input.assets.iter().map(|k| k.symbol.clone()).collect(),
        matrix,
        pairs,
        strongest_positive,
        strongest_negative,
        pair_count,
        average_correlation,
        observations: returns.iter().map(Vec::len).collect(),
    };

    let elapsed = start.elapsed().as_micros() as u64;
    Ok(with_metadata_f64(
        "Pearson Return Correlation Matrix",
        &serde_json::json!({
            "n_assets": n,
            "period": input.period,
            "as_of": as_of.to_rfc3339(),
            "return_type": "simple",
        }),
        warnings,
        elapsed,
        output,
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
