//! Deterministic derivation of performance, risk, and trade statistics
//! from a trade log and equity curve (spec §4.4). Pure function of its
//! inputs: no randomness, no hidden state.

use quant_core::Interval;
use serde::{Deserialize, Serialize};

use crate::models::{ExitReason, SimConfig, Trade};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    pub net_profit: f64,
    pub net_profit_pct: f64,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub total_return_pct: f64,
    pub cagr: f64,
    pub buy_and_hold_return_pct: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RiskMetrics {
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub max_drawdown_pct: f64,
    pub calmar_ratio: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TradeAnalysis {
    pub total_trades: usize,
    pub winning_trades: usize,
    pub losing_trades: usize,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub best_trade: f64,
    pub worst_trade: f64,
    pub avg_pnl: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub avg_bars_held: f64,
    pub avg_bars_held_winners: f64,
    pub avg_bars_held_losers: f64,
    pub avg_mfe: f64,
    pub avg_mae: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Metrics {
    pub performance: PerformanceMetrics,
    pub risk: RiskMetrics,
    pub trades: TradeAnalysis,
}

/// Bar-to-bar period returns, with non-finite values sanitized to 0 and
/// non-positive equity treated as `initial_capital` (spec §4.4).
fn period_returns(equity: &[f64], initial_capital: f64) -> Vec<f64> {
    if equity.len() < 2 {
        return Vec::new();
    }
    let sanitized: Vec<f64> = equity.iter().map(|&e| if e > 0.0 { e } else { initial_capital }).collect();
    (1..sanitized.len())
        .map(|i| {
            let r = (sanitized[i] - sanitized[i - 1]) / sanitized[i - 1];
            if r.is_finite() { r } else { 0.0 }
        })
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

fn stddev(values: &[f64], ddof: usize) -> f64 {
    if values.len() <= ddof {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - ddof) as f64;
    var.sqrt()
}

fn max_drawdown(equity: &[f64]) -> f64 {
    let mut peak = f64::MIN;
    let mut worst = 0.0;
    for &e in equity {
        peak = peak.max(e);
        if peak > 0.0 {
            let dd = (peak - e) / peak;
            worst = worst.max(dd);
        }
    }
    worst
}

/// `first_close`/`last_close` are the underlying instrument's opening and
/// closing prices over the run, used only for the buy-and-hold comparison
/// (spec §4.4); pass `None` when no price series is available.
pub fn compute_metrics(
    equity: &[f64],
    trades: &[Trade],
    interval: Interval,
    config: SimConfig,
    buy_and_hold: Option<(f64, f64)>,
) -> Metrics {
    let initial_capital = config.initial_capital;
    let final_equity = equity.last().copied().unwrap_or(initial_capital);

    let gross_profit: f64 = trades.iter().map(|t| t.pnl).filter(|&p| p > 0.0).sum();
    let gross_loss: f64 = trades.iter().map(|t| t.pnl).filter(|&p| p < 0.0).sum();
    let net_profit = final_equity - initial_capital;
    let net_profit_pct = if initial_capital > 0.0 { net_profit / initial_capital * 100.0 } else { 0.0 };
    let total_return_pct = if initial_capital > 0.0 { (final_equity / initial_capital - 1.0) * 100.0 } else { 0.0 };

    let n_bars = equity.len().max(1);
    let periods_per_year = interval.periods_per_year();
    let years = n_bars as f64 / periods_per_year;
    let cagr = if years > 0.0 && final_equity > 0.0 && initial_capital > 0.0 {
        (final_equity / initial_capital).powf(1.0 / years) - 1.0
    } else {
        0.0
    };

    let buy_and_hold_return_pct = match buy_and_hold {
        Some((first_close, last_close)) if first_close > 0.0 => (last_close / first_close - 1.0) * 100.0,
        _ => 0.0,
    };

    let returns = period_returns(equity, initial_capital);
    let rf_per_period = config.risk_free_rate / periods_per_year;
    let mean_r = mean(&returns);
    let std_r = stddev(&returns, 1);
    let sharpe_ratio = if std_r > 0.0 {
        ((mean_r - rf_per_period) / std_r * periods_per_year.sqrt()).clamp(-100.0, 100.0)
    } else {
        0.0
    };

    let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
    let downside_std = stddev(&downside, 1);
    let sortino_ratio = if downside_std > 0.0 {
        ((mean_r - rf_per_period) / downside_std * periods_per_year.sqrt()).clamp(-100.0, 100.0)
    } else {
        0.0
    };

    let max_drawdown_pct = max_drawdown(equity) * 100.0;
    let calmar_ratio = if max_drawdown_pct > 0.0 { cagr / (max_drawdown_pct / 100.0) } else { 0.0 };

    let total_trades = trades.len();
    let winners: Vec<&Trade> = trades.iter().filter(|t| t.pnl > 0.0).collect();
    let losers: Vec<&Trade> = trades.iter().filter(|t| t.pnl < 0.0).collect();
    let winning_trades = winners.len();
    let losing_trades = losers.len();
    let win_rate = if total_trades > 0 { winning_trades as f64 / total_trades as f64 * 100.0 } else { 0.0 };
    let profit_factor = if gross_loss.abs() > 0.0 {
        gross_profit / gross_loss.abs()
    } else if gross_profit > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };
    let best_trade = trades.iter().map(|t| t.pnl).fold(f64::NEG_INFINITY, f64::max);
    let worst_trade = trades.iter().map(|t| t.pnl).fold(f64::INFINITY, f64::min);
    let avg_pnl = mean(&trades.iter().map(|t| t.pnl).collect::<Vec<_>>());
    let avg_win = mean(&winners.iter().map(|t| t.pnl).collect::<Vec<_>>());
    let avg_loss = mean(&losers.iter().map(|t| t.pnl).collect::<Vec<_>>());
    let avg_bars_held = mean(&trades.iter().map(|t| t.bars_held as f64).collect::<Vec<_>>());
    let avg_bars_held_winners = mean(&winners.iter().map(|t| t.bars_held as f64).collect::<Vec<_>>());
    let avg_bars_held_losers = mean(&losers.iter().map(|t| t.bars_held as f64).collect::<Vec<_>>());
    let avg_mfe = mean(&trades.iter().map(|t| t.mfe).collect::<Vec<_>>());
    let avg_mae = mean(&trades.iter().map(|t| t.mae).collect::<Vec<_>>());

    Metrics {
        performance: PerformanceMetrics {
            net_profit,
            net_profit_pct,
            gross_profit,
            gross_loss,
            total_return_pct,
            cagr,
            buy_and_hold_return_pct,
        },
        risk: RiskMetrics {
            sharpe_ratio,
            sortino_ratio,
            max_drawdown_pct,
            calmar_ratio,
        },
        trades: TradeAnalysis {
            total_trades,
            winning_trades,
            losing_trades,
            win_rate,
            profit_factor,
            best_trade: if total_trades > 0 { best_trade } else { 0.0 },
            worst_trade: if total_trades > 0 { worst_trade } else { 0.0 },
            avg_pnl,
            avg_win,
            avg_loss,
            avg_bars_held,
            avg_bars_held_winners,
            avg_bars_held_losers,
            avg_mfe,
            avg_mae,
        },
    }
}

/// Counts trades closed for `exit_reason` (used by scenario-style tests
/// and the walk-forward consistency aggregate).
pub fn count_by_exit_reason(trades: &[Trade], reason: ExitReason) -> usize {
    trades.iter().filter(|t| t.exit_reason == reason).count()
}
