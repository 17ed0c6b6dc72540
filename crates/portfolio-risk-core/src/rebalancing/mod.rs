pub mod rebalancer;
