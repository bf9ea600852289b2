use quant_backtest::{compute_metrics, BacktestEngine, SimConfig};
use quant_core::{CoreError, OhlcvSeries};
use quant_signals::{ParamMap, ParamValue, StrategyRegistry};
use tracing::{info, warn};

use crate::cancellation::CancellationToken;
use crate::grid::{run_grid, GridConstraints};
use crate::scoring::{score, ScoringKind};
use crate::space::ParameterSpace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowMode {
    Rolling,
    Anchored,
}

/// Walk-forward configuration (spec §6's `WFOConfig`).
#[derive(Debug, Clone, Copy)]
pub struct WfoConfig {
    pub in_sample_size: usize,
    pub out_sample_size: usize,
    pub step_size: usize,
    pub mode: WindowMode,
    pub min_trades: usize,
    pub max_drawdown_limit: f64,
}

#[derive(Debug, Clone)]
pub struct WfoPeriod {
    pub period_index: usize,
    pub in_sample_start: usize,
    pub in_sample_end: usize,
    pub out_sample_start: usize,
    pub out_sample_end: usize,
    pub best_params: ParamMap,
    pub in_sample_metric: f64,
    pub out_sample_metric: f64,
    pub efficiency: f64,
    pub degradation: f64,
    pub out_of_sample_net_profit: f64,
}

#[derive(Debug, Clone)]
pub struct ParameterStability {
    pub name: String,
    pub mean: f64,
    pub std: f64,
    pub stability_score: f64,
}

#[derive(Debug, Clone)]
pub struct WfoResult {
    pub periods: Vec<WfoPeriod>,
    pub skipped_periods: Vec<(usize, String)>,
    pub average_efficiency: f64,
    pub consistency_score: f64,
    pub parameter_stability: Vec<ParameterStability>,
    pub robustness_score: f64,
    pub cancelled: bool,
}

fn slice_series(series: &OhlcvSeries, start: usize, end: usize) -> Result<OhlcvSeries, CoreError> {
    let candles = series.as_slice()[start..end].to_vec();
    OhlcvSeries::new(series.interval, candles)
}

/// Runs the rolling/anchored walk-forward procedure (spec §4.6): for each
/// period, grid-search the in-sample window (C5), apply the winning
/// parameters out-of-sample (single C3 run), and aggregate efficiency,
/// consistency, and per-parameter stability across periods.
pub fn run_walk_forward(
    series: &OhlcvSeries,
    registry: &StrategyRegistry,
    strategy_name: &str,
    base_params: &ParamMap,
    space: &ParameterSpace,
    sim_config: SimConfig,
    scoring: ScoringKind,
    wfo_config: WfoConfig,
    cancellation: &CancellationToken,
) -> Result<WfoResult, CoreError> {
    let n = series.len();
    if wfo_config.in_sample_size == 0 || wfo_config.out_sample_size == 0 || wfo_config.step_size == 0 {
        return Err(CoreError::ConfigError(
            "in_sample_size, out_sample_size, and step_size must all be positive".into(),
        ));
    }
    if n < wfo_config.in_sample_size + wfo_config.out_sample_size {
        return Err(CoreError::InsufficientDataError(
            "series is shorter than a single in-sample + out-of-sample window".into(),
        ));
    }

    let constraints = GridConstraints {
        min_trades: wfo_config.min_trades,
        max_drawdown_limit: wfo_config.max_drawdown_limit,
    };

    info!(
        series_len = n,
        in_sample_size = wfo_config.in_sample_size,
        out_sample_size = wfo_config.out_sample_size,
        step_size = wfo_config.step_size,
        mode = ?wfo_config.mode,
        "starting walk-forward run"
    );

    let mut periods = Vec::new();
    let mut skipped = Vec::new();
    let mut start_idx = 0usize;
    let mut period_index = 0usize;
    let mut cancelled = false;

    loop {
        let (is_start, is_end) = match wfo_config.mode {
            WindowMode::Rolling => (start_idx, start_idx + wfo_config.in_sample_size),
            WindowMode::Anchored => (0, start_idx + wfo_config.in_sample_size),
        };
        let oos_start = is_end;
        let oos_end = oos_start + wfo_config.out_sample_size;
        if oos_end > n {
            break;
        }

        if cancellation.is_cancelled() {
            cancelled = true;
            break;
        }

        let is_series = slice_series(series, is_start, is_end)?;
        let grid_result = run_grid(
            &is_series,
            registry,
            strategy_name,
            base_params,
            space,
            sim_config,
            constraints,
            scoring,
            cancellation,
        )?;

        let best = grid_result.results.iter().find(|r| r.valid);
        match best {
            None => {
                warn!(period_index, "no valid in-sample parameter set, skipping period");
                skipped.push((period_index, "no valid in-sample parameter set".to_string()));
            }
            Some(best) => {
                let is_metric = best.score;
                let mut oos_params = base_params.clone();
                for (k, v) in &best.params {
                    oos_params.insert(k.clone(), v.clone());
                }

                let oos_series = slice_series(series, oos_start, oos_end)?;
                let strategy = registry.build(strategy_name, &oos_params)?;
                let oos_signals = strategy.generate(&oos_series)?;
                let engine = BacktestEngine::new(sim_config)?;
                let oos_output = engine.run(&oos_series, &oos_signals)?;
                let oos_metrics =
                    compute_metrics(&oos_output.equity, &oos_output.trades, oos_series.interval, sim_config, None);
                let oos_metric = score(&oos_metrics, scoring);

                let efficiency = if is_metric != 0.0 { oos_metric / is_metric } else { 0.0 };
                let degradation = is_metric - oos_metric;

                periods.push(WfoPeriod {
                    period_index,
                    in_sample_start: is_start,
                    in_sample_end: is_end,
                    out_sample_start: oos_start,
                    out_sample_end: oos_end,
                    best_params: oos_params,
                    in_sample_metric: is_metric,
                    out_sample_metric: oos_metric,
                    efficiency,
                    degradation,
                    out_of_sample_net_profit: oos_metrics.performance.net_profit,
                });
            }
        }

        start_idx += wfo_config.step_size;
        period_index += 1;
    }

    if periods.is_empty() {
        return Err(CoreError::InsufficientDataError(
            "walk-forward run produced zero valid periods".into(),
        ));
    }

    let average_efficiency = periods.iter().map(|p| p.efficiency).sum::<f64>() / periods.len() as f64;
    let positive_periods = periods.iter().filter(|p| p.out_of_sample_net_profit > 0.0).count();
    let consistency_score = positive_periods as f64 / periods.len() as f64;

    let parameter_stability = compute_parameter_stability(&periods);
    let mean_stability = if parameter_stability.is_empty() {
        0.0
    } else {
        parameter_stability.iter().map(|p| p.stability_score).sum::<f64>() / parameter_stability.len() as f64
    };

    let robustness_score = 0.4 * (average_efficiency * 100.0).clamp(0.0, 100.0)
        + 0.3 * consistency_score * 100.0
        + 0.3 * mean_stability * 100.0;

    info!(
        periods = periods.len(),
        skipped = skipped.len(),
        robustness_score,
        cancelled,
        "walk-forward run complete"
    );

    Ok(WfoResult {
        periods,
        skipped_periods: skipped,
        average_efficiency,
        consistency_score,
        parameter_stability,
        robustness_score,
        cancelled,
    })
}

fn compute_parameter_stability(periods: &[WfoPeriod]) -> Vec<ParameterStability> {
    let mut names: Vec<String> = Vec::new();
    for p in periods {
        for k in p.best_params.keys() {
            if !names.contains(k) {
                names.push(k.clone());
            }
        }
    }

    names
        .into_iter()
        .filter_map(|name| {
            let values: Vec<f64> = periods
                .iter()
                .filter_map(|p| match p.best_params.get(&name) {
                    Some(ParamValue::Number(v)) => Some(*v),
                    Some(ParamValue::Integer(v)) => Some(*v as f64),
                    _ => None,
                })
                .collect();
            if values.is_empty() {
                return None;
            }
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
            let std = variance.sqrt();
            let stability_score = if mean.abs() > 1e-12 { (1.0 - std / mean.abs()).max(0.0) } else { 0.0 };
            Some(ParameterStability {
                name,
                mean,
                std,
                stability_score,
            })
        })
        .collect()
}
