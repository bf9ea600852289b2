use chrono::{TimeZone, Utc};

use crate::types::{Candle, Interval, OhlcvSeries, SignalResult};

fn candle(minute: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        timestamp: Utc.timestamp_opt(1_700_000_000 + minute * 60, 0).unwrap(),
        open,
        high,
        low,
        close,
        volume: 100.0,
    }
}

#[test]
fn valid_candle_passes_ohlc_invariant() {
    let c = candle(0, 100.0, 105.0, 99.0, 103.0);
    assert!(c.is_valid());
}

#[test]
fn candle_with_high_below_close_is_invalid() {
    let mut c = candle(0, 100.0, 101.0, 99.0, 103.0);
    c.high = 101.0;
    assert!(!c.is_valid());
}

#[test]
fn series_rejects_non_monotonic_timestamps() {
    let c0 = candle(1, 100.0, 101.0, 99.0, 100.0);
    let c1 = candle(0, 100.0, 101.0, 99.0, 100.0);
    let err = OhlcvSeries::new(Interval::OneMinute, vec![c0, c1]).unwrap_err();
    assert!(format!("{err}").contains("timestamp"));
}

#[test]
fn empty_series_is_accepted() {
    let series = OhlcvSeries::new(Interval::OneHour, vec![]).unwrap();
    assert!(series.is_empty());
}

#[test]
fn signal_result_validates_length() {
    let sig = SignalResult::empty(3);
    assert!(sig.validate_len(3).is_ok());
    assert!(sig.validate_len(4).is_err());
}

#[test]
fn periods_per_year_matches_spec_constants() {
    assert_eq!(Interval::OneHour.periods_per_year(), 8760.0);
    assert_eq!(Interval::OneDay.periods_per_year(), 365.0);
}
