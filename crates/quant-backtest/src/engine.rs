//! Bar-by-bar simulator (the hard core): position lifecycle, leverage,
//! fees, slippage, stop-loss / take-profit / trailing-stop, pyramiding,
//! long/short/both directions, cash and equity accounting.

use quant_core::{CoreError, OhlcvSeries, SignalResult};
use tracing::{debug, trace, warn};

use crate::models::{ExitReason, Position, RunMetadata, Side, SimConfig, Trade};

/// Reconstructs an intrabar tick path from OHLC for bar-magnifier mode
/// (spec §9). Up-bars (`close >= open`) walk `open -> high -> low ->
/// close`; down-bars walk `open -> low -> high -> close`. This is a
/// modeling convention, not ground truth.
fn bar_magnifier_path(open: f64, high: f64, low: f64, close: f64) -> [f64; 4] {
    if close >= open {
        [open, high, low, close]
    } else {
        [open, low, high, close]
    }
}

struct ExitDecision {
    price: f64,
    reason: ExitReason,
}

pub struct BacktestEngine {
    config: SimConfig,
}

impl BacktestEngine {
    pub fn new(config: SimConfig) -> Result<Self, CoreError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Runs the full simulation and returns trades, equity curve, and any
    /// still-open positions (spec §4.3). Empty OHLCV returns an equity
    /// array of length 1 holding `initial_capital` and no trades.
    pub fn run(&self, series: &OhlcvSeries, signals: &SignalResult) -> Result<SimOutput, CoreError> {
        let n = series.len();
        if n == 0 {
            return Ok(SimOutput {
                trades: Vec::new(),
                equity: vec![self.config.initial_capital],
                open_positions: Vec::new(),
            });
        }
        signals.validate_len(n)?;

        let cfg = &self.config;
        // `cash` holds capital not currently locked as margin in an open
        // position. Step 4/5 of the per-bar procedure keep it consistent
        // with the trade log: entering a position reserves `margin +
        // entry_fees`; closing one releases `margin + trade.pnl` (trade.pnl
        // is net of exit fees only, per §3 — the entry fee stays spent).
        let mut cash = cfg.initial_capital;
        let mut open_positions: Vec<Position> = Vec::with_capacity(cfg.max_positions);
        let mut trades: Vec<Trade> = Vec::with_capacity((n / 10).max(1));
        let mut equity: Vec<f64> = Vec::with_capacity(n);

        for i in 0..n {
            let candle = &series[i];
            let entries_allowed = i + cfg.entry_cutoff_bars < n;

            self.update_extrema(&mut open_positions, candle.high, candle.low);

            let mut still_open = Vec::with_capacity(open_positions.len());
            for position in open_positions.drain(..) {
                let decision = self
                    .evaluate_exit(&position, candle)
                    .or_else(|| self.signal_exit(&position, signals, i, candle.close));
                match decision {
                    Some(decision) => {
                        let trade = self.close_position(position, i, decision, &mut cash);
                        trace!(bar = i, pnl = trade.pnl, reason = ?trade.exit_reason, "position closed");
                        trades.push(trade);
                    }
                    None => still_open.push(position),
                }
            }
            open_positions = still_open;

            if entries_allowed && open_positions.len() < cfg.max_positions {
                if cfg.direction.allows_long() && signals.long_entries[i] {
                    self.open_position(Side::Long, i, candle.close, &mut cash, &mut open_positions);
                } else if cfg.direction.allows_short() && signals.short_entries[i] {
                    self.open_position(Side::Short, i, candle.close, &mut cash, &mut open_positions);
                }
            }

            // Equity = free cash + (margin + unrealized pnl) of every open
            // position — margin is reserved out of `cash`, not spent.
            let locked: f64 = open_positions
                .iter()
                .map(|p| p.margin + p.unrealized_pnl(candle.close))
                .sum();
            equity.push(cash + locked);
        }

        // End-of-data: force close anything still open (exit_reason =
        // end_of_data), per spec §4.3 / §9.
        let last = &series[n - 1];
        for position in open_positions.drain(..) {
            let decision = ExitDecision {
                price: last.close,
                reason: ExitReason::EndOfData,
            };
            let trade = self.close_position(position, n - 1, decision, &mut cash);
            trades.push(trade);
        }
        if let Some(last_equity) = equity.last_mut() {
            *last_equity = cash;
        }

        debug!(bars = n, trades = trades.len(), "backtest run complete");

        Ok(SimOutput {
            trades,
            equity,
            open_positions: Vec::new(),
        })
    }

    fn update_extrema(&self, positions: &mut [Position], high: f64, low: f64) {
        for p in positions.iter_mut() {
            p.update_extrema(high, low);
        }
    }

    /// Step 2 of the per-bar procedure: resolves SL / TP / trailing /
    /// signal exits in fixed priority order.
    fn evaluate_exit(&self, position: &Position, candle: &quant_core::Candle) -> Option<ExitDecision> {
        let cfg = &self.config;
        let entry = position.entry_price;
        let leverage = cfg.leverage;

        let (worst_pnl_pct, best_pnl_pct) = match position.side {
            Side::Long => (
                (candle.low - entry) / entry * leverage,
                (candle.high - entry) / entry * leverage,
            ),
            Side::Short => (
                (entry - candle.high) / entry * leverage,
                (entry - candle.low) / entry * leverage,
            ),
        };

        if cfg.use_bar_magnifier {
            return self.evaluate_exit_magnified(position, candle);
        }

        if cfg.stop_loss > 0.0 && worst_pnl_pct <= -cfg.stop_loss {
            let raw = match position.side {
                Side::Long => entry * (1.0 - cfg.stop_loss / leverage),
                Side::Short => entry * (1.0 + cfg.stop_loss / leverage),
            };
            let clamped = raw.clamp(candle.low, candle.high);
            let price = apply_adverse_slippage(clamped, position.side, cfg.slippage);
            return Some(ExitDecision {
                price,
                reason: ExitReason::StopLoss,
            });
        }

        if cfg.take_profit > 0.0 && best_pnl_pct >= cfg.take_profit {
            let raw = match position.side {
                Side::Long => entry * (1.0 + cfg.take_profit / leverage),
                Side::Short => entry * (1.0 - cfg.take_profit / leverage),
            };
            let price = raw.clamp(candle.low, candle.high);
            return Some(ExitDecision {
                price,
                reason: ExitReason::TakeProfit,
            });
        }

        if cfg.trailing_stop > 0.0 {
            let triggered = match position.side {
                Side::Long => {
                    let retrace = (position.max_favorable_price - candle.low) / position.max_favorable_price;
                    retrace >= cfg.trailing_stop / leverage
                }
                Side::Short => {
                    let retrace = (candle.high - position.max_favorable_price) / position.max_favorable_price;
                    retrace >= cfg.trailing_stop / leverage
                }
            };
            if triggered {
                let raw = match position.side {
                    Side::Long => position.max_favorable_price * (1.0 - cfg.trailing_stop / leverage),
                    Side::Short => position.max_favorable_price * (1.0 + cfg.trailing_stop / leverage),
                };
                let price = raw.clamp(candle.low, candle.high);
                return Some(ExitDecision {
                    price,
                    reason: ExitReason::TrailingStop,
                });
            }
        }

        None
    }

    /// Bar-magnifier variant of [`Self::evaluate_exit`]: walks the
    /// reconstructed intrabar path and fires on the first level touched,
    /// resolving SL/TP/trailing by distance along the leg with SL > TP >
    /// trailing as the tie-break (spec §9's priority order still applies
    /// inside a single touched leg).
    fn evaluate_exit_magnified(&self, position: &Position, candle: &quant_core::Candle) -> Option<ExitDecision> {
        let cfg = &self.config;
        let entry = position.entry_price;
        let leverage = cfg.leverage;
        let up_bar = candle.close >= candle.open;
        let path = bar_magnifier_path(candle.open, candle.high, candle.low, candle.close);

        let stop_price = (cfg.stop_loss > 0.0).then(|| match position.side {
            Side::Long => entry * (1.0 - cfg.stop_loss / leverage),
            Side::Short => entry * (1.0 + cfg.stop_loss / leverage),
        });
        let take_price = (cfg.take_profit > 0.0).then(|| match position.side {
            Side::Long => entry * (1.0 + cfg.take_profit / leverage),
            Side::Short => entry * (1.0 - cfg.take_profit / leverage),
        });

        // `position.max_favorable_price` already reflects this bar's own
        // high/low (`update_extrema` runs before this is called). If this
        // bar is what set the current peak, the trailing level it implies
        // must only apply to the path *after* the peak is actually
        // reached — checking it against the whole path would have the
        // open->peak leg itself "touch" a level derived from that same
        // leg's endpoint, firing a trailing exit on a bar that only ever
        // rallied.
        let trailing_price = (cfg.trailing_stop > 0.0).then(|| match position.side {
            Side::Long => position.max_favorable_price * (1.0 - cfg.trailing_stop / leverage),
            Side::Short => position.max_favorable_price * (1.0 + cfg.trailing_stop / leverage),
        });
        let peak_set_this_bar = match position.side {
            Side::Long => position.max_favorable_price == candle.high,
            Side::Short => position.max_favorable_price == candle.low,
        };
        let trailing_active_from = if peak_set_this_bar {
            match (position.side, up_bar) {
                (Side::Long, true) | (Side::Short, false) => 1,
                (Side::Long, false) | (Side::Short, true) => 2,
            }
        } else {
            0
        };

        for (window_index, window) in path.windows(2).enumerate() {
            let (from, to) = (window[0], window[1]);
            let lo = from.min(to);
            let hi = from.max(to);

            let mut touched: Vec<(f64, ExitDecision)> = Vec::with_capacity(3);
            if let Some(sl) = stop_price {
                if sl >= lo && sl <= hi {
                    touched.push((
                        (sl - from).abs(),
                        ExitDecision {
                            price: apply_adverse_slippage(sl, position.side, cfg.slippage),
                            reason: ExitReason::StopLoss,
                        },
                    ));
                }
            }
            if let Some(tp) = take_price {
                if tp >= lo && tp <= hi {
                    touched.push((
                        (tp - from).abs(),
                        ExitDecision {
                            price: tp,
                            reason: ExitReason::TakeProfit,
                        },
                    ));
                }
            }
            if let Some(tr) = trailing_price {
                if window_index >= trailing_active_from && tr >= lo && tr <= hi {
                    touched.push((
                        (tr - from).abs(),
                        ExitDecision {
                            price: tr,
                            reason: ExitReason::TrailingStop,
                        },
                    ));
                }
            }

            if !touched.is_empty() {
                // Stable sort: ties keep push order (SL, TP, trailing).
                touched.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
                return touched.into_iter().next().map(|(_, decision)| decision);
            }
        }

        None
    }

    fn signal_exit(&self, position: &Position, signals: &SignalResult, i: usize, close: f64) -> Option<ExitDecision> {
        let fired = match position.side {
            Side::Long => signals.long_exits[i],
            Side::Short => signals.short_exits[i],
        };
        if fired {
            Some(ExitDecision {
                price: apply_adverse_slippage(close, position.side, self.config.slippage),
                reason: ExitReason::Signal,
            })
        } else {
            None
        }
    }

    fn open_position(
        &self,
        side: Side,
        bar_index: usize,
        close: f64,
        cash: &mut f64,
        open_positions: &mut Vec<Position>,
    ) {
        let cfg = &self.config;
        let raw_entry_price = match side {
            Side::Long => close * (1.0 + cfg.slippage),
            Side::Short => close * (1.0 - cfg.slippage),
        };
        if !(raw_entry_price > 0.0) {
            warn!(bar = bar_index, close, "skipping entry: non-positive entry price after slippage");
            return;
        }

        let margin = *cash * cfg.position_size;
        let notional = margin * cfg.leverage;
        let size = notional / (raw_entry_price * (1.0 + cfg.taker_fee));
        let entry_fees = notional * cfg.taker_fee;

        *cash -= margin + entry_fees;

        open_positions.push(Position {
            side,
            entry_bar_index: bar_index,
            entry_price: raw_entry_price,
            size,
            margin,
            entry_fees,
            max_favorable_price: raw_entry_price,
            max_adverse_price: raw_entry_price,
        });
    }

    fn close_position(
        &self,
        position: Position,
        exit_bar_index: usize,
        decision: ExitDecision,
        cash: &mut f64,
    ) -> Trade {
        let cfg = &self.config;
        let exit_price = decision.price;
        let exit_notional = position.size * exit_price;
        let exit_fees = exit_notional * cfg.taker_fee;

        let gross_pnl = match position.side {
            Side::Long => (exit_price - position.entry_price) * position.size,
            Side::Short => (position.entry_price - exit_price) * position.size,
        };
        let pnl = gross_pnl - exit_fees;
        let pnl_pct = if position.margin > 0.0 { pnl / position.margin } else { 0.0 };
        let total_fees = position.entry_fees + exit_fees;

        *cash += position.margin + pnl;

        let (mfe, mae) = match position.side {
            Side::Long => (
                (position.max_favorable_price - position.entry_price) * position.size,
                (position.max_adverse_price - position.entry_price) * position.size,
            ),
            Side::Short => (
                (position.entry_price - position.max_favorable_price) * position.size,
                (position.entry_price - position.max_adverse_price) * position.size,
            ),
        };
        let (mfe_pct, mae_pct) = if position.margin > 0.0 {
            (mfe / position.margin, mae / position.margin)
        } else {
            (0.0, 0.0)
        };

        Trade {
            side: position.side,
            entry_bar_index: position.entry_bar_index,
            exit_bar_index,
            entry_price: position.entry_price,
            exit_price,
            size: position.size,
            pnl,
            pnl_pct,
            fees: total_fees,
            mfe,
            mae,
            mfe_pct,
            mae_pct,
            exit_reason: decision.reason,
            bars_held: exit_bar_index.saturating_sub(position.entry_bar_index),
        }
    }
}

fn apply_adverse_slippage(price: f64, side: Side, slippage: f64) -> f64 {
    match side {
        Side::Long => price * (1.0 - slippage),
        Side::Short => price * (1.0 + slippage),
    }
}

pub struct SimOutput {
    pub trades: Vec<Trade>,
    pub equity: Vec<f64>,
    pub open_positions: Vec<Position>,
}

pub fn run_backtest(
    series: &OhlcvSeries,
    signals: &SignalResult,
    config: SimConfig,
    version_tag: &str,
) -> Result<crate::models::BacktestResult, CoreError> {
    let engine = BacktestEngine::new(config)?;
    let output = engine.run(series, signals)?;
    let buy_and_hold = if series.is_empty() {
        None
    } else {
        Some((series[0].close, series[series.len() - 1].close))
    };
    let metrics = crate::metrics::compute_metrics(&output.equity, &output.trades, series.interval, config, buy_and_hold);
    Ok(crate::models::BacktestResult {
        trades: output.trades,
        equity: output.equity,
        metrics,
        config_echo: config,
        open_positions: output.open_positions,
        metadata: RunMetadata::new(version_tag),
    })
}
