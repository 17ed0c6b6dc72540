pub mod config;
pub mod error;
pub mod types;

pub mod sampling;

#[cfg(feature = "correlation")]
pub mod correlation;

#[cfg(feature = "optimization")]
pub mod optimization;

#[cfg(feature = "monte_carlo")]
pub mod monte_carlo;

#[cfg(feature = "stress")]
pub mod stress;

#[cfg(feature = "rebalancing")]
pub mod rebalancing;

#[cfg(feature = "analytics")]
pub mod analytics;

pub use error::PortfolioRiskError;
pub use types::*;

/// Standard result type for all portfolio-risk operations
pub type PortfolioRiskResult<T> = Result<T, PortfolioRiskError>;
