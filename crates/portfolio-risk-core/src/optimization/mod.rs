pub mod covariance;
pub mod frontier;
pub mod metrics;
pub mod search;
