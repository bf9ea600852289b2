use quant_core::{CoreError, OhlcvSeries, SignalResult};
use quant_indicators::{bollinger_bands, cross_above, cross_below, macd, rsi, sma};

use crate::graph::StrategyGraph;
use crate::params::{get_f64, get_f64_or, get_usize, ParamMap};

/// Closed sum type over the strategy catalog (spec §9 redesign flag: the
/// source resolves strategies via a string → class mapping at runtime,
/// here that lookup only happens once, at construction time, in the
/// separate [`crate::registry::StrategyRegistry`]).
#[derive(Debug, Clone)]
pub enum StrategyKind {
    SmaCrossover(SmaCrossoverParams),
    Rsi(RsiParams),
    Macd(MacdParams),
    BollingerMeanReversion(BollingerParams),
    Grid(GridParams),
    Dca(DcaParams),
    Martingale(MartingaleParams),
    Custom(StrategyGraph),
}

#[derive(Debug, Clone, Copy)]
pub struct SmaCrossoverParams {
    pub fast_period: usize,
    pub slow_period: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct RsiParams {
    pub period: usize,
    pub oversold: f64,
    pub overbought: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct MacdParams {
    pub fast: usize,
    pub slow: usize,
    pub signal: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct BollingerParams {
    pub period: usize,
    pub num_std: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct GridParams {
    pub levels: usize,
    pub level_spacing_pct: f64,
    pub lookback: usize,
    pub profit_target_pct: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct DcaParams {
    pub interval_bars: usize,
    pub max_entries: usize,
    pub take_profit_pct: f64,
    pub max_hold_bars: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct MartingaleParams {
    pub rsi_period: usize,
    pub oversold: f64,
    pub drop_pct: f64,
    pub max_entries: usize,
    pub target_pct: f64,
}

impl StrategyKind {
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            StrategyKind::SmaCrossover(p) => {
                if p.fast_period == 0 || p.slow_period == 0 {
                    return Err(CoreError::ConfigError("sma periods must be positive".into()));
                }
                if p.fast_period >= p.slow_period {
                    return Err(CoreError::ConfigError("fast_period must be < slow_period".into()));
                }
                Ok(())
            }
            StrategyKind::Rsi(p) => {
                if p.period == 0 {
                    return Err(CoreError::ConfigError("rsi period must be positive".into()));
                }
                if !(0.0 < p.oversold && p.oversold < p.overbought && p.overbought < 100.0) {
                    return Err(CoreError::ConfigError(
                        "rsi thresholds must satisfy 0 < oversold < overbought < 100".into(),
                    ));
                }
                Ok(())
            }
            StrategyKind::Macd(p) => {
                if p.fast == 0 || p.slow == 0 || p.signal == 0 {
                    return Err(CoreError::ConfigError("macd periods must be positive".into()));
                }
                if p.fast >= p.slow {
                    return Err(CoreError::ConfigError("macd fast period must be < slow period".into()));
                }
                Ok(())
            }
            StrategyKind::BollingerMeanReversion(p) => {
                if p.period == 0 {
                    return Err(CoreError::ConfigError("bollinger period must be positive".into()));
                }
                if p.num_std <= 0.0 {
                    return Err(CoreError::ConfigError("bollinger num_std must be positive".into()));
                }
                Ok(())
            }
            StrategyKind::Grid(p) => {
                if p.levels == 0 || p.lookback == 0 {
                    return Err(CoreError::ConfigError("grid levels and lookback must be positive".into()));
                }
                if p.level_spacing_pct <= 0.0 || p.profit_target_pct <= 0.0 {
                    return Err(CoreError::ConfigError("grid spacing and profit target must be positive".into()));
                }
                Ok(())
            }
            StrategyKind::Dca(p) => {
                if p.interval_bars == 0 || p.max_entries == 0 {
                    return Err(CoreError::ConfigError("dca interval and max_entries must be positive".into()));
                }
                if p.take_profit_pct <= 0.0 {
                    return Err(CoreError::ConfigError("dca take_profit_pct must be positive".into()));
                }
                Ok(())
            }
            StrategyKind::Martingale(p) => {
                if p.max_entries == 0 {
                    return Err(CoreError::ConfigError("martingale max_entries must be positive".into()));
                }
                if !(0.0 < p.oversold && p.oversold < 100.0) {
                    return Err(CoreError::ConfigError("martingale oversold must be in (0, 100)".into()));
                }
                if p.drop_pct <= 0.0 || p.target_pct <= 0.0 {
                    return Err(CoreError::ConfigError("martingale drop_pct and target_pct must be positive".into()));
                }
                Ok(())
            }
            StrategyKind::Custom(graph) => graph.validate(),
        }
    }

    /// Generates the four aligned signal streams (spec §4.2). Indicator
    /// warm-up bars and NaN inputs translate to `false` by construction,
    /// since every comparison against `f64::NAN` is false.
    pub fn generate(&self, series: &OhlcvSeries) -> Result<SignalResult, CoreError> {
        self.validate()?;
        let n = series.len();
        if n == 0 {
            return Ok(SignalResult::empty(0));
        }

        let result = match self {
            StrategyKind::SmaCrossover(p) => {
                let closes = series.closes();
                let fast = sma(&closes, p.fast_period);
                let slow = sma(&closes, p.slow_period);
                let long_entries = cross_above(&fast, &slow);
                let long_exits = cross_below(&fast, &slow);
                SignalResult {
                    short_entries: long_exits.clone(),
                    short_exits: long_entries.clone(),
                    long_entries,
                    long_exits,
                }
            }
            StrategyKind::Rsi(p) => {
                let closes = series.closes();
                let rsi_values = rsi(&closes, p.period);
                let oversold_line = vec![p.oversold; n];
                let overbought_line = vec![p.overbought; n];
                let raw_long_entries = cross_above(&rsi_values, &oversold_line);
                let raw_long_exits = cross_below(&rsi_values, &overbought_line);
                // Emulates next-bar-open execution: shift the whole stream
                // forward by one bar.
                let long_entries = shift_forward(&raw_long_entries);
                let long_exits = shift_forward(&raw_long_exits);
                let short_entries = shift_forward(&raw_long_exits);
                let short_exits = shift_forward(&raw_long_entries);
                SignalResult {
                    long_entries,
                    long_exits,
                    short_entries,
                    short_exits,
                }
            }
            StrategyKind::Macd(p) => {
                let closes = series.closes();
                let macd_result = macd(&closes, p.fast, p.slow, p.signal);
                let long_entries = cross_above(&macd_result.macd_line, &macd_result.signal_line);
                let long_exits = cross_below(&macd_result.macd_line, &macd_result.signal_line);
                SignalResult {
                    short_entries: long_exits.clone(),
                    short_exits: long_entries.clone(),
                    long_entries,
                    long_exits,
                }
            }
            StrategyKind::BollingerMeanReversion(p) => {
                let closes = series.closes();
                let bands = bollinger_bands(&closes, p.period, p.num_std);
                let long_entries = cross_below(&closes, &bands.lower);
                let long_exits = cross_above(&closes, &bands.upper);
                SignalResult {
                    short_entries: long_exits.clone(),
                    short_exits: long_entries.clone(),
                    long_entries,
                    long_exits,
                }
            }
            StrategyKind::Grid(p) => generate_grid(series, p),
            StrategyKind::Dca(p) => generate_dca(series, p),
            StrategyKind::Martingale(p) => generate_martingale(series, p),
            StrategyKind::Custom(graph) => {
                let (long_entries, long_exits, short_entries, short_exits) = graph.evaluate(series)?;
                SignalResult {
                    long_entries,
                    long_exits,
                    short_entries,
                    short_exits,
                }
            }
        };

        result.validate_len(n)?;
        Ok(result)
    }
}

fn shift_forward(signal: &[bool]) -> Vec<bool> {
    let mut out = vec![false; signal.len()];
    for i in 1..signal.len() {
        out[i] = signal[i - 1];
    }
    out
}

/// Entries on each of `levels` price steps below a rolling high of the
/// last `lookback` bars; exits on a profit target measured from the
/// rolling low. Long-only: grid strategies in this catalog do not mirror
/// to a short side.
fn generate_grid(series: &OhlcvSeries, p: &GridParams) -> SignalResult {
    let closes = series.closes();
    let n = closes.len();
    let mut long_entries = vec![false; n];
    let mut long_exits = vec![false; n];

    for i in p.lookback..n {
        let window = &closes[i - p.lookback..i];
        let rolling_high = window.iter().cloned().fold(f64::MIN, f64::max);
        let rolling_low = window.iter().cloned().fold(f64::MAX, f64::min);

        for level in 1..=p.levels {
            let level_price = rolling_high * (1.0 - p.level_spacing_pct * level as f64 / 100.0);
            if (closes[i - 1] > level_price) && (closes[i] <= level_price) {
                long_entries[i] = true;
                break;
            }
        }

        let target_price = rolling_low * (1.0 + p.profit_target_pct / 100.0);
        if closes[i - 1] < target_price && closes[i] >= target_price {
            long_exits[i] = true;
        }
    }

    SignalResult {
        long_entries,
        long_exits,
        short_entries: vec![false; n],
        short_exits: vec![false; n],
    }
}

/// Time-spaced entries every `interval_bars`, up to `max_entries`, exit on
/// aggregate take-profit from the weighted average entry price or after
/// `max_hold_bars` since the first entry. Long-only.
fn generate_dca(series: &OhlcvSeries, p: &DcaParams) -> SignalResult {
    let closes = series.closes();
    let n = closes.len();
    let mut long_entries = vec![false; n];
    let mut long_exits = vec![false; n];

    let mut entries_taken = 0usize;
    let mut weighted_sum = 0.0;
    let mut first_entry_bar: Option<usize> = None;

    for i in 0..n {
        let in_position = entries_taken > 0;
        if !in_position || entries_taken < p.max_entries {
            let since_first = first_entry_bar.map(|f| i >= f && (i - f) % p.interval_bars == 0).unwrap_or(true);
            if since_first && entries_taken < p.max_entries {
                long_entries[i] = true;
                weighted_sum += closes[i];
                entries_taken += 1;
                if first_entry_bar.is_none() {
                    first_entry_bar = Some(i);
                }
                continue;
            }
        }
        if in_position {
            let avg_entry = weighted_sum / entries_taken as f64;
            let take_profit_price = avg_entry * (1.0 + p.take_profit_pct / 100.0);
            let held_too_long = first_entry_bar.map(|f| i - f >= p.max_hold_bars).unwrap_or(false);
            if closes[i] >= take_profit_price || held_too_long {
                long_exits[i] = true;
                entries_taken = 0;
                weighted_sum = 0.0;
                first_entry_bar = None;
            }
        }
    }

    SignalResult {
        long_entries,
        long_exits,
        short_entries: vec![false; n],
        short_exits: vec![false; n],
    }
}

/// RSI-oversold seeds the first entry; additional entries fire each time
/// price drops `drop_pct` below the previous entry, up to `max_entries`.
/// Exit when price recovers to the weighted-average entry plus
/// `target_pct`. Long-only.
fn generate_martingale(series: &OhlcvSeries, p: &MartingaleParams) -> SignalResult {
    let closes = series.closes();
    let n = closes.len();
    let mut long_entries = vec![false; n];
    let mut long_exits = vec![false; n];

    let rsi_values = rsi(&closes, p.rsi_period);
    let oversold_line = vec![p.oversold; n];
    let rsi_entry_signal = cross_above(&rsi_values, &oversold_line);

    let mut entries_taken = 0usize;
    let mut weighted_sum = 0.0;
    let mut last_entry_price = 0.0;

    for i in 0..n {
        if entries_taken == 0 {
            if rsi_entry_signal[i] {
                long_entries[i] = true;
                weighted_sum = closes[i];
                last_entry_price = closes[i];
                entries_taken = 1;
            }
            continue;
        }

        if entries_taken < p.max_entries {
            let trigger_price = last_entry_price * (1.0 - p.drop_pct / 100.0);
            if closes[i] <= trigger_price {
                long_entries[i] = true;
                weighted_sum += closes[i];
                last_entry_price = closes[i];
                entries_taken += 1;
                continue;
            }
        }

        let avg_entry = weighted_sum / entries_taken as f64;
        let target_price = avg_entry * (1.0 + p.target_pct / 100.0);
        if closes[i] >= target_price {
            long_exits[i] = true;
            entries_taken = 0;
            weighted_sum = 0.0;
            last_entry_price = 0.0;
        }
    }

    SignalResult {
        long_entries,
        long_exits,
        short_entries: vec![false; n],
        short_exits: vec![false; n],
    }
}

pub fn sma_crossover_from_params(params: &ParamMap) -> Result<StrategyKind, CoreError> {
    let kind = StrategyKind::SmaCrossover(SmaCrossoverParams {
        fast_period: get_usize(params, "fast_period")?,
        slow_period: get_usize(params, "slow_period")?,
    });
    kind.validate()?;
    Ok(kind)
}

pub fn rsi_from_params(params: &ParamMap) -> Result<StrategyKind, CoreError> {
    let kind = StrategyKind::Rsi(RsiParams {
        period: get_usize(params, "period")?,
        oversold: get_f64_or(params, "oversold", 30.0)?,
        overbought: get_f64_or(params, "overbought", 70.0)?,
    });
    kind.validate()?;
    Ok(kind)
}

pub fn macd_from_params(params: &ParamMap) -> Result<StrategyKind, CoreError> {
    let kind = StrategyKind::Macd(MacdParams {
        fast: get_usize_or_default(params, "fast", 12)?,
        slow: get_usize_or_default(params, "slow", 26)?,
        signal: get_usize_or_default(params, "signal", 9)?,
    });
    kind.validate()?;
    Ok(kind)
}

pub fn bollinger_from_params(params: &ParamMap) -> Result<StrategyKind, CoreError> {
    let kind = StrategyKind::BollingerMeanReversion(BollingerParams {
        period: get_usize_or_default(params, "period", 20)?,
        num_std: get_f64_or(params, "num_std", 2.0)?,
    });
    kind.validate()?;
    Ok(kind)
}

pub fn grid_from_params(params: &ParamMap) -> Result<StrategyKind, CoreError> {
    let kind = StrategyKind::Grid(GridParams {
        levels: get_usize(params, "levels")?,
        level_spacing_pct: get_f64(params, "level_spacing_pct")?,
        lookback: get_usize(params, "lookback")?,
        profit_target_pct: get_f64(params, "profit_target_pct")?,
    });
    kind.validate()?;
    Ok(kind)
}

pub fn dca_from_params(params: &ParamMap) -> Result<StrategyKind, CoreError> {
    let kind = StrategyKind::Dca(DcaParams {
        interval_bars: get_usize(params, "interval_bars")?,
        max_entries: get_usize(params, "max_entries")?,
        take_profit_pct: get_f64(params, "take_profit_pct")?,
        max_hold_bars: get_usize(params, "max_hold_bars")?,
    });
    kind.validate()?;
    Ok(kind)
}

pub fn martingale_from_params(params: &ParamMap) -> Result<StrategyKind, CoreError> {
    let kind = StrategyKind::Martingale(MartingaleParams {
        rsi_period: get_usize_or_default(params, "rsi_period", 14)?,
        oversold: get_f64_or(params, "oversold", 30.0)?,
        drop_pct: get_f64(params, "drop_pct")?,
        max_entries: get_usize(params, "max_entries")?,
        target_pct: get_f64(params, "target_pct")?,
    });
    kind.validate()?;
    Ok(kind)
}

fn get_usize_or_default(params: &ParamMap, name: &str, default: usize) -> Result<usize, CoreError> {
    crate::params::get_usize_or(params, name, default)
}
