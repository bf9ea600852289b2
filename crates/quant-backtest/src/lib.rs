pub mod engine;
pub mod metrics;
pub mod models;

pub use engine::{run_backtest, BacktestEngine, SimOutput};
pub use metrics::{compute_metrics, Metrics, PerformanceMetrics, RiskMetrics, TradeAnalysis};
pub use models::{
    BacktestResult, Direction, EquityPoint, ExitReason, Position, RunMetadata, Side, SimConfig, Trade,
};

#[cfg(test)]
mod tests;
