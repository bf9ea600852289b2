use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use quant_core::{Candle, Interval, OhlcvSeries, SignalResult};

use crate::engine::BacktestEngine;
use crate::models::{Direction, ExitReason, SimConfig};

fn candle(minute: i64, open: f64, high: f64, low: f64, close: f64) -> Candle {
    Candle {
        timestamp: Utc.timestamp_opt(1_700_000_000 + minute * 60, 0).unwrap(),
        open,
        high,
        low,
        close,
        volume: 1000.0,
    }
}

fn base_config() -> SimConfig {
    SimConfig {
        initial_capital: 10_000.0,
        position_size: 1.0,
        leverage: 1.0,
        taker_fee: 0.0,
        maker_fee: 0.0,
        slippage: 0.0,
        stop_loss: 0.0,
        take_profit: 0.0,
        trailing_stop: 0.0,
        direction: Direction::Both,
        max_positions: 1,
        use_bar_magnifier: false,
        risk_free_rate: 0.0,
        entry_cutoff_bars: 0,
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

#[test]
fn empty_series_returns_single_point_equity_and_no_trades() {
    init_tracing();
    let series = OhlcvSeries::new(Interval::OneMinute, vec![]).unwrap();
    let signals = SignalResult::empty(0);
    let engine = BacktestEngine::new(base_config()).unwrap();
    let output = engine.run(&series, &signals).unwrap();
    assert_eq!(output.equity, vec![10_000.0]);
    assert!(output.trades.is_empty());
}

// Scenario A: single long trade, 10x leverage, 1% move.
#[test]
fn scenario_a_leveraged_long_trade() {
    let n = 30;
    let mut candles = Vec::with_capacity(n);
    for i in 0..n {
        let price = if i < 10 {
            100_000.0
        } else if i < 20 {
            100_000.0
        } else {
            101_000.0
        };
        candles.push(candle(i as i64, price, price, price, price));
    }
    let series = OhlcvSeries::new(Interval::OneMinute, candles).unwrap();

    let mut signals = SignalResult::empty(n);
    signals.long_entries[10] = true;
    signals.long_exits[20] = true;

    let mut config = base_config();
    config.leverage = 10.0;
    config.taker_fee = 0.0007;
    config.entry_cutoff_bars = 0;

    let engine = BacktestEngine::new(config).unwrap();
    let output = engine.run(&series, &signals).unwrap();

    assert_eq!(output.trades.len(), 1);
    let trade = &output.trades[0];
    assert!((trade.size - 0.99930).abs() < 1e-4);
    assert!((trade.pnl - 928.65).abs() < 1.0);

    let final_equity = *output.equity.last().unwrap();
    assert!((final_equity - 10_858.65).abs() < 1.0);
}

// Scenario B: SL wins over TP in the same bar.
#[test]
fn scenario_b_stop_loss_priority_over_take_profit() {
    let candles = vec![
        candle(0, 100.0, 100.0, 100.0, 100.0),
        candle(1, 100.5, 105.0, 97.0, 103.0),
        candle(2, 103.0, 103.0, 103.0, 103.0),
    ];
    let series = OhlcvSeries::new(Interval::OneMinute, candles).unwrap();

    let mut signals = SignalResult::empty(3);
    signals.long_entries[0] = true;

    let mut config = base_config();
    config.stop_loss = 0.02;
    config.take_profit = 0.04;
    config.entry_cutoff_bars = 0;

    let engine = BacktestEngine::new(config).unwrap();
    let output = engine.run(&series, &signals).unwrap();

    assert_eq!(output.trades.len(), 1);
    let trade = &output.trades[0];
    assert_eq!(trade.exit_reason, ExitReason::StopLoss);
    assert!((trade.exit_price - 98.0).abs() < 1e-9);
}

// Scenario C: bar-magnifier flips the outcome for an up-bar.
#[test]
fn scenario_c_bar_magnifier_resolves_to_take_profit() {
    let candles = vec![
        candle(0, 100.0, 100.0, 100.0, 100.0),
        candle(1, 100.5, 105.0, 97.0, 103.0),
        candle(2, 103.0, 103.0, 103.0, 103.0),
    ];
    let series = OhlcvSeries::new(Interval::OneMinute, candles).unwrap();

    let mut signals = SignalResult::empty(3);
    signals.long_entries[0] = true;

    let mut config = base_config();
    config.stop_loss = 0.02;
    config.take_profit = 0.04;
    config.use_bar_magnifier = true;
    config.entry_cutoff_bars = 0;

    let engine = BacktestEngine::new(config).unwrap();
    let output = engine.run(&series, &signals).unwrap();

    assert_eq!(output.trades.len(), 1);
    let trade = &output.trades[0];
    assert_eq!(trade.exit_reason, ExitReason::TakeProfit);
    assert!((trade.exit_price - 104.0).abs() < 1e-9);
}

// Bar-magnifier mode must still resolve trailing-stop exits, not just SL/TP.
#[test]
fn scenario_d_bar_magnifier_resolves_trailing_stop() {
    let candles = vec![
        candle(0, 100.0, 100.0, 100.0, 100.0),
        // Rallies to a new peak of 110 but never retraces more than 5%
        // intrabar (low=105): the trailing level this bar implies (104.5)
        // must not fire off this same rallying leg.
        candle(1, 105.0, 110.0, 105.0, 109.0),
        // No new peak this bar (high=109 < 110); the sharp drop to 95
        // crosses the 104.5 trailing level set by bar 1's peak.
        candle(2, 109.0, 109.0, 95.0, 96.0),
    ];
    let series = OhlcvSeries::new(Interval::OneMinute, candles).unwrap();

    let mut signals = SignalResult::empty(3);
    signals.long_entries[0] = true;

    let mut config = base_config();
    config.trailing_stop = 0.05;
    config.use_bar_magnifier = true;
    config.entry_cutoff_bars = 0;

    let engine = BacktestEngine::new(config).unwrap();
    let output = engine.run(&series, &signals).unwrap();

    assert_eq!(output.trades.len(), 1);
    let trade = &output.trades[0];
    assert_eq!(trade.exit_reason, ExitReason::TrailingStop);
    assert_eq!(trade.exit_bar_index, 2);
    // Trails off bar 1's peak of 110: trigger level = 110 * (1 - 0.05) = 104.5,
    // touched on bar 2's down-leg (open=109 -> low=95).
    assert!((trade.exit_price - 104.5).abs() < 1e-9);
}

#[test]
fn direction_long_never_opens_a_short() {
    let n = 10;
    let candles: Vec<Candle> = (0..n).map(|i| candle(i as i64, 100.0, 101.0, 99.0, 100.0)).collect();
    let series = OhlcvSeries::new(Interval::OneMinute, candles).unwrap();

    let mut signals = SignalResult::empty(n);
    for v in signals.short_entries.iter_mut() {
        *v = true;
    }

    let mut config = base_config();
    config.direction = Direction::Long;
    config.entry_cutoff_bars = 0;

    let engine = BacktestEngine::new(config).unwrap();
    let output = engine.run(&series, &signals).unwrap();
    assert!(output.trades.is_empty());
}

#[test]
fn end_of_data_force_closes_open_positions() {
    let n = 10;
    let candles: Vec<Candle> = (0..n).map(|i| candle(i as i64, 100.0, 101.0, 99.0, 100.0 + i as f64)).collect();
    let series = OhlcvSeries::new(Interval::OneMinute, candles).unwrap();

    let mut signals = SignalResult::empty(n);
    signals.long_entries[0] = true;

    let mut config = base_config();
    config.entry_cutoff_bars = 5;

    let engine = BacktestEngine::new(config).unwrap();
    let output = engine.run(&series, &signals).unwrap();

    assert_eq!(output.trades.len(), 1);
    assert_eq!(output.trades[0].exit_reason, ExitReason::EndOfData);
    assert_eq!(output.trades[0].exit_bar_index, n - 1);
}

#[test]
fn determinism_two_runs_produce_identical_output() {
    let n = 50;
    let candles: Vec<Candle> = (0..n)
        .map(|i| candle(i as i64, 100.0 + (i as f64 * 0.3).sin(), 101.0, 99.0, 100.0 + (i as f64 * 0.3).cos()))
        .collect();
    let series = OhlcvSeries::new(Interval::OneMinute, candles).unwrap();
    let mut signals = SignalResult::empty(n);
    signals.long_entries[5] = true;
    signals.long_exits[15] = true;
    signals.long_entries[20] = true;
    signals.long_exits[30] = true;

    let engine = BacktestEngine::new(base_config()).unwrap();
    let run1 = engine.run(&series, &signals).unwrap();
    let run2 = engine.run(&series, &signals).unwrap();

    assert_eq!(run1.equity, run2.equity);
    for (a, b) in run1.trades.iter().zip(run2.trades.iter()) {
        assert_eq!(a.pnl, b.pnl);
        assert_eq!(a.exit_reason, b.exit_reason);
    }
}

proptest! {
    // Spec §8 property #1: sizing linearity. Runs the real engine at 1x
    // and Lx leverage on an identical scripted entry and compares the
    // actual `Trade.size` it produces, rather than re-deriving the sizing
    // formula inline.
    #[test]
    fn sizing_scales_linearly_with_leverage(
        margin_fraction in 0.1f64..1.0,
        leverage in 1.0f64..20.0,
        entry_price in 10.0f64..5000.0,
        fee in 0.0f64..0.01,
    ) {
        let candles = vec![
            candle(0, entry_price, entry_price, entry_price, entry_price),
            candle(1, entry_price, entry_price, entry_price, entry_price),
        ];
        let series = OhlcvSeries::new(Interval::OneMinute, candles).unwrap();
        let mut signals = SignalResult::empty(2);
        signals.long_entries[0] = true;

        let mut config_1x = base_config();
        config_1x.position_size = margin_fraction;
        config_1x.taker_fee = fee;
        config_1x.entry_cutoff_bars = 0;
        config_1x.leverage = 1.0;

        let mut config_lx = config_1x;
        config_lx.leverage = leverage;

        let output_1x = BacktestEngine::new(config_1x).unwrap().run(&series, &signals).unwrap();
        let output_lx = BacktestEngine::new(config_lx).unwrap().run(&series, &signals).unwrap();

        prop_assert_eq!(output_1x.trades.len(), 1);
        prop_assert_eq!(output_lx.trades.len(), 1);

        let size_1x = output_1x.trades[0].size;
        let size_lx = output_lx.trades[0].size;
        prop_assert!((size_lx - leverage * size_1x).abs() < 1e-6 * size_lx.max(1.0));
    }

    // Spec §8 property #3: equity/trades consistency at end of data.
    #[test]
    fn equity_matches_trades_minus_entry_fees(
        move_pct in -0.2f64..0.2,
        leverage in 1.0f64..5.0,
        fee in 0.0f64..0.003,
    ) {
        let entry_price = 100.0;
        let exit_price = entry_price * (1.0 + move_pct);
        let candles = vec![
            candle(0, entry_price, entry_price, entry_price, entry_price),
            candle(1, exit_price, exit_price.max(entry_price), exit_price.min(entry_price), exit_price),
        ];
        let series = OhlcvSeries::new(Interval::OneMinute, candles).unwrap();
        let mut signals = SignalResult::empty(2);
        signals.long_entries[0] = true;

        let mut config = base_config();
        config.leverage = leverage;
        config.taker_fee = fee;
        config.entry_cutoff_bars = 0;

        let engine = BacktestEngine::new(config).unwrap();
        let output = engine.run(&series, &signals).unwrap();

        // `trade.fees` is entry_fees + exit_fees; exit_fees reconstructs
        // exactly from size * exit_price * fee since exit sizing has no
        // leverage/fee division baked in, unlike entry sizing.
        let total_entry_fees: f64 = output
            .trades
            .iter()
            .map(|t| t.fees - t.size * t.exit_price * fee)
            .sum();
        let total_pnl: f64 = output.trades.iter().map(|t| t.pnl).sum();
        let expected = 10_000.0 + total_pnl - total_entry_fees;
        let final_equity = *output.equity.last().unwrap();
        prop_assert!((final_equity - expected).abs() < 1e-6 * expected.abs().max(1.0));
    }
}
