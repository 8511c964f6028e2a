pub mod lightning;
pub mod logging;
pub mod rebalance;
