use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};

use crate::config::DEFAULT_HISTORY_RETENTION;
use crate::error::PortfolioRiskError;
use crate::types::AssetClass;
use crate::PortfolioRiskResult;

/// Identity of a price series.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetKey {
    pub symbol: String,
    pub asset_class: AssetClass,
}

impl AssetKey {
    pub fn new(symbol: impl Into<String>, asset_class: AssetClass) -> Self {
        Self {
            symbol: symbol.into(),
            asset_class,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceSample {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Lookback window for period-filtered history reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum LookbackPeriod {
    #[serde(rename = "1d")]
    OneDay,
    #[serde(rename = "1w")]
    OneWeek,
    #[default]
    #[serde(rename = "1m")]
    OneMonth,
    #[serde(rename = "3m")]
    ThreeMonths,
    #[serde(rename = "1y")]
    OneYear,
}

impl LookbackPeriod {
    pub fn duration(self) -> Duration {
        match self {
            LookbackPeriod::OneDay => Duration::days(1),
            LookbackPeriod::OneWeek => Duration::weeks(1),
            LookbackPeriod::OneMonth => Duration::days(30),
            LookbackPeriod::ThreeMonths => Duration::days(90),
            LookbackPeriod::OneYear => Duration::days(365),
        }
    }
}

/// Store of per-asset price samples.
///
/// Implementations must be shareable across threads; every operation takes
/// `&self`. Samples are returned oldest first.
pub trait PriceHistoryRepository: Send + Sync {
    /// Record a sample. A sample at an already-stored timestamp replaces it.
    fn append(&self, key: &AssetKey, sample: PriceSample) -> PortfolioRiskResult<()>;

    fn samples(&self, key: &AssetKey) -> Vec<PriceSample>;

    fn samples_since(&self, key: &AssetKey, since: DateTime<Utc>) -> Vec<PriceSample> {
        self.samples(key)
            .into_iter()
            .filter(|s| s.timestamp >= since)
            .collect()
    }

    fn clear_asset(&self, key: &AssetKey);

    fn clear(&self);
}

/// In-process repository with bounded per-asset retention.
#[derive(Debug)]
pub struct InMemoryPriceHistory {
    retention: usize,
    series: RwLock<HashMap<AssetKey, VecDeque<PriceSample>>>,
}

impl Default for InMemoryPriceHistory {
    fn default() -> Self {
        Self::with_retention(DEFAULT_HISTORY_RETENTION)
    }
}

impl InMemoryPriceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep at most `retention` samples per asset (minimum 2).
    pub fn with_retention(retention: usize) -> Self {
        Self {
            retention: retention.max(2),
            series: RwLock::new(HashMap::new()),
        }
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn len(&self, key: &AssetKey) -> usize {
        self.series.read().get(key).map_or(0, VecDeque::len)
    }

    pub fn is_empty(&self) -> bool {
        self.series.read().values().all(VecDeque::is_empty)
    }

    /// Bulk-load a series, e.g. from a JSON input.
    pub fn extend(
        &self,
        key: &AssetKey,
        samples: impl IntoIterator<Item = PriceSample>,
    ) -> PortfolioRiskResult<()> {
        for s in samples {
            self.append(key, s)?;
        }
        Ok(())
    }
}

impl PriceHistoryRepository for InMemoryPriceHistory {
    fn append(&self, key: &AssetKey, sample: PriceSample) -> PortfolioRiskResult<()> {
        if !sample.price.is_finite() || sample.price <= 0.0 {
            return Err(PortfolioRiskError::invalid(
                format!("price_history.{}", key.symbol),
                "Price must be finite and positive",
            ));
        }
        let mut guard = self.series.write();
        let series = guard.entry(key.clone()).or_default();

        match series.back() {
            Some(last) if last.timestamp < sample.timestamp => series.push_back(sample),
            None => series.push_back(sample),
            _ => {
                // Out-of-order or duplicate timestamp
                let idx = series.partition_point(|s| s.timestamp < sample.timestamp);
                if series
                    .get(idx)
                    .is_some_and(|s| s.timestamp == sample.timestamp)
                {
                    series[idx] = sample;
                } else {
                    series.insert(idx, sample);
                }
            }
        }

        while series.len() > self.retention {
            series.pop_front();
        }
        Ok(())
    }

    fn samples(&self, key: &AssetKey) -> Vec<PriceSample> {
        self.series
            .read()
            .get(key)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default()
    }

    fn clear_asset(&self, key: &AssetKey) {
        self.series.write().remove(key);
    }

    fn clear(&self) {
        self.series.write().clear();
    }
}

/// Simple returns p[t]/p[t-1] - 1 of an ordered price series.
pub fn simple_returns(samples: &[PriceSample]) -> Vec<f64> {
    samples
        .windows(2)
        .filter(|w| w[0].price > 0.0)
        .map(|w| w[1].price / w[0].price - 1.0)
        .collect()
}
