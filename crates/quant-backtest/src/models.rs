use quant_core::CoreError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
    Both,
}

impl Direction {
    pub fn allows_long(self) -> bool {
        matches!(self, Direction::Long | Direction::Both)
    }

    pub fn allows_short(self) -> bool {
        matches!(self, Direction::Short | Direction::Both)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    TrailingStop,
    EndOfData,
}

/// Execution and risk configuration for a single simulator call (spec §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SimConfig {
    pub initial_capital: f64,
    /// Fraction of cash allocated to each new entry, `(0, 1]`.
    pub position_size: f64,
    pub leverage: f64,
    pub taker_fee: f64,
    /// Unused by default; reserved for maker-fill order types (spec §6).
    #[serde(default)]
    pub maker_fee: f64,
    pub slippage: f64,
    /// 0 disables the stop-loss.
    #[serde(default)]
    pub stop_loss: f64,
    /// 0 disables the take-profit.
    #[serde(default)]
    pub take_profit: f64,
    /// 0 disables the trailing stop.
    #[serde(default)]
    pub trailing_stop: f64,
    pub direction: Direction,
    pub max_positions: usize,
    #[serde(default)]
    pub use_bar_magnifier: bool,
    #[serde(default)]
    pub risk_free_rate: f64,
    /// Bars before the end of the series during which new entries are
    /// suppressed (spec §4.3 step 3); any still-open position is force
    /// closed at the final bar.
    #[serde(default = "default_entry_cutoff_bars")]
    pub entry_cutoff_bars: usize,
}

fn default_entry_cutoff_bars() -> usize {
    5
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !(self.initial_capital > 0.0) {
            return Err(CoreError::ConfigError("initial_capital must be positive".into()));
        }
        if !(self.position_size > 0.0 && self.position_size <= 1.0) {
            return Err(CoreError::ConfigError("position_size must be in (0, 1]".into()));
        }
        if !(1.0..=125.0).contains(&self.leverage) {
            return Err(CoreError::ConfigError("leverage must be in [1, 125]".into()));
        }
        if self.taker_fee < 0.0 || self.maker_fee < 0.0 {
            return Err(CoreError::ConfigError("fees must be non-negative".into()));
        }
        if self.slippage < 0.0 {
            return Err(CoreError::ConfigError("slippage must be non-negative".into()));
        }
        if self.stop_loss < 0.0 || self.take_profit < 0.0 || self.trailing_stop < 0.0 {
            return Err(CoreError::ConfigError("stop_loss/take_profit/trailing_stop must be non-negative".into()));
        }
        if self.max_positions == 0 {
            return Err(CoreError::ConfigError("max_positions must be at least 1".into()));
        }
        Ok(())
    }
}

/// An open position (spec §3). Sizing invariant: `size = (margin * leverage)
/// / (entry_price * (1 + taker_fee))` — leverage is baked in exactly once,
/// here and nowhere else.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub entry_bar_index: usize,
    pub entry_price: f64,
    pub size: f64,
    pub margin: f64,
    pub entry_fees: f64,
    pub max_favorable_price: f64,
    pub max_adverse_price: f64,
}

impl Position {
    /// Unrealized PnL at the given mark price. Leverage already lives in
    /// `size`; it is never reapplied here.
    pub fn unrealized_pnl(&self, mark_price: f64) -> f64 {
        match self.side {
            Side::Long => (mark_price - self.entry_price) * self.size,
            Side::Short => (self.entry_price - mark_price) * self.size,
        }
    }

    pub fn update_extrema(&mut self, high: f64, low: f64) {
        self.max_favorable_price = match self.side {
            Side::Long => self.max_favorable_price.max(high),
            Side::Short => self.max_favorable_price.min(low),
        };
        self.max_adverse_price = match self.side {
            Side::Long => self.max_adverse_price.min(low),
            Side::Short => self.max_adverse_price.max(high),
        };
    }
}

/// A closed round-trip trade (spec §3).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Trade {
    pub side: Side,
    pub entry_bar_index: usize,
    pub exit_bar_index: usize,
    pub entry_price: f64,
    pub exit_price: f64,
    pub size: f64,
    pub pnl: f64,
    pub pnl_pct: f64,
    pub fees: f64,
    pub mfe: f64,
    pub mae: f64,
    pub mfe_pct: f64,
    pub mae_pct: f64,
    pub exit_reason: ExitReason,
    pub bars_held: usize,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct EquityPoint {
    pub bar_index: usize,
    pub equity: f64,
}

/// Run identification attached to a persisted result (spec §6: "run
/// identification (timestamp, version tag)").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub run_id: Uuid,
    pub version_tag: String,
}

impl RunMetadata {
    pub fn new(version_tag: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            version_tag: version_tag.into(),
        }
    }
}

/// Output of a single simulator call (spec §6): `{ trades[], equity[],
/// metrics, config_echo }`, plus run identification for persistence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub trades: Vec<Trade>,
    pub equity: Vec<f64>,
    pub metrics: crate::metrics::Metrics,
    pub config_echo: SimConfig,
    pub open_positions: Vec<Position>,
    pub metadata: RunMetadata,
}
