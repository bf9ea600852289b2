use quant_backtest::Metrics;

/// Scoring functions shared by the grid optimizer (spec §4.5) and the
/// walk-forward optimizer's "metric to optimize" (spec §4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoringKind {
    SharpeRatio,
    ProfitFactor,
    /// `(total_return / max_drawdown) × sharpe × sqrt(win_rate)`, grounded
    /// on `original_source/backend/optimization/grid_optimizer.py`.
    Composite,
}

pub fn score(metrics: &Metrics, kind: ScoringKind) -> f64 {
    match kind {
        ScoringKind::SharpeRatio => metrics.risk.sharpe_ratio,
        ScoringKind::ProfitFactor => metrics.trades.profit_factor,
        ScoringKind::Composite => {
            let dd = metrics.risk.max_drawdown_pct;
            if dd <= 1e-9 {
                return 0.0;
            }
            let return_over_dd = metrics.performance.total_return_pct / dd;
            let win_rate_fraction = (metrics.trades.win_rate / 100.0).max(0.0);
            return_over_dd * metrics.risk.sharpe_ratio * win_rate_fraction.sqrt()
        }
    }
}
