use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PortfolioRiskError;
use crate::PortfolioRiskResult;

/// Monetary values on the order-facing side (rebalancing). Decimal, never f64.
pub type Money = Decimal;

/// Rates expressed as decimals (0.05 = 5%). Never as percentages.
pub type Rate = f64;

/// Broad asset class of an instrument. Drives the static correlation,
/// crisis-shock and sensitivity tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetClass {
    Stock,
    Crypto,
    Bond,
    Commodity,
    Forex,
}

impl AssetClass {
    pub const ALL: [AssetClass; 5] = [
        AssetClass::Stock,
        AssetClass::Crypto,
        AssetClass::Bond,
        AssetClass::Commodity,
        AssetClass::Forex,
    ];

    /// Annualized volatility assumed for a holding that carries no estimate.
    pub fn default_volatility(self) -> f64 {
        match self {
            AssetClass::Stock => 0.25,
            AssetClass::Crypto => 0.70,
            AssetClass::Bond => 0.06,
            AssetClass::Commodity => 0.20,
            AssetClass::Forex => 0.10,
        }
    }

    /// Market beta assumed for a holding that carries no estimate.
    pub fn default_beta(self) -> f64 {
        match self {
            AssetClass::Stock => 1.0,
            AssetClass::Crypto => 1.5,
            AssetClass::Bond => 0.2,
            AssetClass::Commodity => 0.5,
            AssetClass::Forex => 0.1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AssetClass::Stock => "stock",
            AssetClass::Crypto => "crypto",
            AssetClass::Bond => "bond",
            AssetClass::Commodity => "commodity",
            AssetClass::Forex => "forex",
        }
    }
}

impl std::fmt::Display for AssetClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-asset estimates supplied by the market-data / signal layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetProfile {
    pub symbol: String,
    pub asset_class: AssetClass,
    /// Annualized expected return
    pub expected_return: Rate,
    /// Annualized volatility (>= 0)
    pub volatility: Rate,
    pub current_price: f64,
    /// Periodic historical returns, oldest first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub historical_returns: Option<Vec<f64>>,
}

/// A current position as reported by the position-sync layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Holding {
    pub symbol: String,
    pub asset_class: AssetClass,
    pub quantity: f64,
    pub current_price: f64,
    /// Annualized volatility; the asset-class default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volatility: Option<Rate>,
    /// Market beta; the asset-class default applies when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub beta: Option<f64>,
}

impl Holding {
    pub fn market_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    pub fn effective_volatility(&self) -> f64 {
        self.volatility
            .unwrap_or_else(|| self.asset_class.default_volatility())
    }

    pub fn effective_beta(&self) -> f64 {
        self.beta.unwrap_or_else(|| self.asset_class.default_beta())
    }

    /// Bonds, plus gold-tracking commodities.
    pub fn is_defensive(&self) -> bool {
        match self.asset_class {
            AssetClass::Bond => true,
            AssetClass::Commodity => {
                let s = self.symbol.to_uppercase();
                s.contains("GOLD") || s.contains("XAU") || s == "GLD" || s == "IAU"
            }
            _ => false,
        }
    }
}

/// Standard computation output envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

/// Wrap a Decimal-precision result with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    wrap(
        methodology,
        assumptions,
        warnings,
        elapsed_us,
        "rust_decimal_128bit",
        result,
    )
}

/// Wrap a floating-point result with metadata
pub fn with_metadata_f64<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    wrap(
        methodology,
        assumptions,
        warnings,
        elapsed_us,
        "ieee754_f64",
        result,
    )
}

fn wrap<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    precision: &str,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: precision.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Shared validation
// ---------------------------------------------------------------------------

pub(crate) fn ensure_finite(field: &str, value: f64) -> PortfolioRiskResult<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PortfolioRiskError::invalid(field, "Must be a finite number"))
    }
}

pub(crate) fn validate_asset_profiles(assets: &[AssetProfile]) -> PortfolioRiskResult<()> {
    if assets.is_empty() {
        return Err(PortfolioRiskError::invalid(
            "assets",
            "At least one asset required",
        ));
    }
    for a in assets {
        if a.symbol.trim().is_empty() {
            return Err(PortfolioRiskError::invalid(
                "assets.symbol",
                "Symbol must not be empty",
            ));
        }
        ensure_finite(&format!("assets.{}.expected_return", a.symbol), a.expected_return)?;
        ensure_finite(&format!("assets.{}.volatility", a.symbol), a.volatility)?;
        ensure_finite(&format!("assets.{}.current_price", a.symbol), a.current_price)?;
        if a.volatility < 0.0 {
            return Err(PortfolioRiskError::invalid(
                format!("assets.{}.volatility", a.symbol),
                "Volatility cannot be negative",
            ));
        }
        if let Some(ref hist) = a.historical_returns {
            if hist.iter().any(|r| !r.is_finite()) {
                return Err(PortfolioRiskError::invalid(
                    format!("assets.{}.historical_returns", a.symbol),
                    "Historical returns must be finite",
                ));
            }
        }
    }
    Ok(())
}

pub(crate) fn validate_holdings(holdings: &[Holding]) -> PortfolioRiskResult<f64> {
    if holdings.is_empty() {
        return Err(PortfolioRiskError::invalid(
            "holdings",
            "Portfolio must contain at least one holding",
        ));
    }
    for h in holdings {
        ensure_finite(&format!("holdings.{}.quantity", h.symbol), h.quantity)?;
        ensure_finite(&format!("holdings.{}.current_price", h.symbol), h.current_price)?;
        if h.quantity < 0.0 || h.current_price < 0.0 {
            return Err(PortfolioRiskError::invalid(
                format!("holdings.{}", h.symbol),
                "Quantity and price must be non-negative",
            ));
        }
        if let Some(v) = h.volatility {
            ensure_finite(&format!("holdings.{}.volatility", h.symbol), v)?;
            if v < 0.0 {
                return Err(PortfolioRiskError::invalid(
                    format!("holdings.{}.volatility", h.symbol),
                    "Volatility cannot be negative",
                ));
            }
        }
        if let Some(b) = h.beta {
            ensure_finite(&format!("holdings.{}.beta", h.symbol), b)?;
        }
    }
    let total: f64 = holdings.iter().map(Holding::market_value).sum();
    if total <= 0.0 {
        return Err(PortfolioRiskError::invalid(
            "holdings",
            "Total portfolio value must be positive",
        ));
    }
    Ok(total)
}
