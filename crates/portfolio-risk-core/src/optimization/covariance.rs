use serde::{Deserialize, Serialize};

use crate::correlation::pearson::{common_tail, pearson_correlation};
use crate::types::{validate_asset_profiles, AssetClass, AssetProfile};
use crate::PortfolioRiskResult;

/// Symmetric N x N covariance matrix with its row/column labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CovarianceMatrix {
    pub symbols: Vec<String>,
    pub values: Vec<Vec<f64>>,
}

impl CovarianceMatrix {
    pub fn size(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        self.values[i][j]
    }

    pub fn is_symmetric(&self, tolerance: f64) -> bool {
        let n = self.size();
        (0..n).all(|i| (0..n).all(|j| (self.values[i][j] - self.values[j][i]).abs() <= tolerance))
    }

    /// w' * Sigma * w. Weights beyond the matrix size are ignored.
    pub fn portfolio_variance(&self, weights: &[f64]) -> f64 {
        let mut var = 0.0;
        for (i, row) in self.values.iter().enumerate() {
            let wi = weights.get(i).copied().unwrap_or(0.0);
            if wi == 0.0 {
                continue;
            }
            for (j, c) in row.iter().enumerate() {
                var += wi * weights.get(j).copied().unwrap_or(0.0) * c;
            }
        }
        var
    }

    pub fn portfolio_volatility(&self, weights: &[f64]) -> f64 {
        self.portfolio_variance(weights).max(0.0).sqrt()
    }
}

/// Fallback correlation between two asset classes when no return history
/// is available. Symmetric in its arguments.
pub fn asset_class_correlation(a: AssetClass, b: AssetClass) -> f64 {
    use AssetClass::*;
    let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
    match (lo, hi) {
        (Stock, Stock) => 0.6,
        (Stock, Crypto) => 0.3,
        (Stock, Bond) => -0.2,
        (Stock, Commodity) => 0.2,
        (Stock, Forex) => 0.1,
        (Crypto, Crypto) => 0.7,
        (Crypto, Bond) => -0.1,
        (Crypto, Commodity) => 0.1,
        (Crypto, Forex) => 0.1,
        (Bond, Bond) => 0.5,
        (Bond, Commodity) => 0.0,
        (Bond, Forex) => 0.1,
        (Commodity, Commodity) => 0.5,
        (Commodity, Forex) => 0.2,
        (Forex, Forex) => 0.4,
        _ => 0.0,
    }
}

/// Correlation used for a pair of assets: their return history when both
/// carry at least two samples, otherwise the asset-class table.
pub fn pair_correlation(a: &AssetProfile, b: &AssetProfile) -> f64 {
    match (&a.historical_returns, &b.historical_returns) {
        (Some(ra), Some(rb)) if ra.len() >= 2 && rb.len() >= 2 => {
            let (x, y) = common_tail(ra, rb);
            pearson_correlation(x, y)
        }
        _ => asset_class_correlation(a.asset_class, b.asset_class),
    }
}

/// Build the covariance matrix for a set of asset profiles.
pub fn build_covariance_matrix(assets: &[AssetProfile]) -> PortfolioRiskResult<CovarianceMatrix> {
    validate_asset_profiles(assets)?;

    let n = assets.len();
    let mut values = vec![vec![0.0; n]; n];
    for i in 0..n {
        values[i][i] = assets[i].volatility * assets[i].volatility;
        for j in (i + 1)..n {
            let cov = pair_correlation(&assets[i], &assets[j])
                * assets[i].volatility
                * assets[j].volatility;
            values[i][j] = cov;
            values[j][i] = cov;
        }
    }

    Ok(CovarianceMatrix {
        symbols: assets.iter().map(|a| a.symbol.clone()).collect(),
        values,
    })
}
