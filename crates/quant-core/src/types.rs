use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Canonical interval tokens (spec §6). The simulator treats these opaquely
/// except for the periods-per-year table used by the metrics calculator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "1")]
    OneMinute,
    #[serde(rename = "3")]
    ThreeMinutes,
    #[serde(rename = "5")]
    FiveMinutes,
    #[serde(rename = "15")]
    FifteenMinutes,
    #[serde(rename = "30")]
    ThirtyMinutes,
    #[serde(rename = "60")]
    OneHour,
    #[serde(rename = "120")]
    TwoHours,
    #[serde(rename = "240")]
    FourHours,
    #[serde(rename = "360")]
    SixHours,
    #[serde(rename = "720")]
    TwelveHours,
    #[serde(rename = "D")]
    OneDay,
    #[serde(rename = "W")]
    OneWeek,
    #[serde(rename = "M")]
    OneMonth,
}

impl Interval {
    /// Periods-per-year constant used to annualize returns (spec §4.4).
    ///
    /// Months and weeks use an approximate calendar-average factor, as the
    /// source does; this is a documented approximation, not exact (spec §9
    /// open question — preserved rather than hidden).
    pub fn periods_per_year(self) -> f64 {
        match self {
            Interval::OneMinute => 525_600.0,
            Interval::ThreeMinutes => 175_200.0,
            Interval::FiveMinutes => 105_120.0,
            Interval::FifteenMinutes => 35_040.0,
            Interval::ThirtyMinutes => 17_520.0,
            Interval::OneHour => 8_760.0,
            Interval::TwoHours => 4_380.0,
            Interval::FourHours => 2_190.0,
            Interval::SixHours => 1_460.0,
            Interval::TwelveHours => 730.0,
            Interval::OneDay => 365.0,
            Interval::OneWeek => 52.0,
            Interval::OneMonth => 12.0,
        }
    }

    /// Nominal bar spacing, used only to validate uniform spacing in an
    /// `OhlcvSeries`.
    pub fn duration(self) -> chrono::Duration {
        use chrono::Duration;
        match self {
            Interval::OneMinute => Duration::minutes(1),
            Interval::ThreeMinutes => Duration::minutes(3),
            Interval::FiveMinutes => Duration::minutes(5),
            Interval::FifteenMinutes => Duration::minutes(15),
            Interval::ThirtyMinutes => Duration::minutes(30),
            Interval::OneHour => Duration::hours(1),
            Interval::TwoHours => Duration::hours(2),
            Interval::FourHours => Duration::hours(4),
            Interval::SixHours => Duration::hours(6),
            Interval::TwelveHours => Duration::hours(12),
            Interval::OneDay => Duration::days(1),
            Interval::OneWeek => Duration::weeks(1),
            Interval::OneMonth => Duration::days(30),
        }
    }
}

/// A single OHLCV bar (spec §3).
///
/// Invariant: `low <= min(open, close) <= max(open, close) <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Candle {
    pub fn is_valid(&self) -> bool {
        let fields_finite = [self.open, self.high, self.low, self.close, self.volume]
            .iter()
            .all(|v| v.is_finite());
        if !fields_finite || self.volume < 0.0 {
            return false;
        }
        let body_lo = self.open.min(self.close);
        let body_hi = self.open.max(self.close);
        self.low <= body_lo && body_hi <= self.high
    }
}

/// An ordered sequence of candles, strictly monotonic in timestamp, with a
/// uniform interval (spec §3). Length `N` is fixed once constructed; the
/// simulator indexes bars by position `i in [0, N)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OhlcvSeries {
    pub interval: Interval,
    candles: Vec<Candle>,
}

impl OhlcvSeries {
    /// Validate and wrap a candle sequence. Empty input is valid (spec §4.3
    /// failure semantics: empty OHLCV is handled downstream, not rejected
    /// here).
    pub fn new(interval: Interval, candles: Vec<Candle>) -> CoreResult<Self> {
        for (i, c) in candles.iter().enumerate() {
            if !c.is_valid() {
                return Err(CoreError::ValidationError(format!(
                    "candle at index {i} violates OHLC invariants or contains non-finite values"
                )));
            }
            if i > 0 && c.timestamp <= candles[i - 1].timestamp {
                return Err(CoreError::ValidationError(format!(
                    "candle at index {i} is not strictly after the previous timestamp"
                )));
            }
        }
        Ok(Self { interval, candles })
    }

    pub fn len(&self) -> usize {
        self.candles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    pub fn as_slice(&self) -> &[Candle] {
        &self.candles
    }

    pub fn closes(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.low).collect()
    }

    pub fn opens(&self) -> Vec<f64> {
        self.candles.iter().map(|c| c.open).collect()
    }
}

impl std::ops::Index<usize> for OhlcvSeries {
    type Output = Candle;
    fn index(&self, idx: usize) -> &Candle {
        &self.candles[idx]
    }
}

/// Four aligned boolean signal streams, one entry per bar of the input
/// series (spec §3). Any of the short streams may be absent, which is
/// equivalent to all-false.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub long_entries: Vec<bool>,
    pub long_exits: Vec<bool>,
    pub short_entries: Vec<bool>,
    pub short_exits: Vec<bool>,
}

impl SignalResult {
    pub fn empty(n: usize) -> Self {
        Self {
            long_entries: vec![false; n],
            long_exits: vec![false; n],
            short_entries: vec![false; n],
            short_exits: vec![false; n],
        }
    }

    pub fn len(&self) -> usize {
        self.long_entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.long_entries.is_empty()
    }

    /// Validate that all four streams are the same length as `n` (spec §4.3
    /// failure semantics: misaligned signal length is a `ValidationError`).
    pub fn validate_len(&self, n: usize) -> CoreResult<()> {
        let lens = [
            self.long_entries.len(),
            self.long_exits.len(),
            self.short_entries.len(),
            self.short_exits.len(),
        ];
        if lens.iter().any(|&l| l != n) {
            return Err(CoreError::ValidationError(format!(
                "signal streams have lengths {lens:?}, expected {n} to match the candle series"
            )));
        }
        Ok(())
    }
}
