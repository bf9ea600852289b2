use rayon::prelude::*;
use tracing::{debug, info, warn};

use quant_backtest::{compute_metrics, BacktestEngine, Metrics, SimConfig};
use quant_core::{CoreError, OhlcvSeries};
use quant_signals::{ParamMap, StrategyRegistry};

use crate::cancellation::CancellationToken;
use crate::scoring::{score, ScoringKind};
use crate::space::ParameterSpace;

/// Validity gate applied to every combination's result (spec §4.5).
#[derive(Debug, Clone, Copy)]
pub struct GridConstraints {
    pub min_trades: usize,
    /// Fraction in `[0, 1]`; a combination's max drawdown must not exceed
    /// this to be `valid`.
    pub max_drawdown_limit: f64,
}

#[derive(Debug, Clone)]
pub struct GridCombinationResult {
    pub insertion_index: usize,
    pub rank: usize,
    pub params: ParamMap,
    pub valid: bool,
    pub score: f64,
    pub error: Option<String>,
    pub metrics: Option<Metrics>,
}

#[derive(Debug, Clone)]
pub struct GridResult {
    pub results: Vec<GridCombinationResult>,
    pub cancelled: bool,
}

impl GridResult {
    pub fn top_n(&self, n: usize) -> &[GridCombinationResult] {
        let end = n.min(self.results.len());
        &self.results[..end]
    }
}

/// Runs the full cartesian product of `space` through C2 (signal
/// generation) → C3 (simulation) → C4 (metrics), tagging each combination
/// `valid` against `constraints` and sorting by `scoring` descending with
/// stable tie-breaking by insertion order (spec §4.5).
///
/// Evaluation is `rayon`-parallel across combinations; `cancellation` is
/// checked per-combination, never inside the per-bar simulator loop.
pub fn run_grid(
    series: &OhlcvSeries,
    registry: &StrategyRegistry,
    strategy_name: &str,
    base_params: &ParamMap,
    space: &ParameterSpace,
    sim_config: SimConfig,
    constraints: GridConstraints,
    scoring: ScoringKind,
    cancellation: &CancellationToken,
) -> Result<GridResult, CoreError> {
    let combos = space.cartesian_product()?;
    info!(combinations = combos.len(), strategy = strategy_name, "starting grid search");

    let mut results: Vec<GridCombinationResult> = combos
        .par_iter()
        .enumerate()
        .map(|(i, combo)| {
            if cancellation.is_cancelled() {
                return GridCombinationResult {
                    insertion_index: i,
                    rank: 0,
                    params: combo.clone(),
                    valid: false,
                    score: f64::NEG_INFINITY,
                    error: Some("cancelled".to_string()),
                    metrics: None,
                };
            }

            let mut params = base_params.clone();
            for (k, v) in combo {
                params.insert(k.clone(), v.clone());
            }

            evaluate_combination(series, registry, strategy_name, &params, sim_config, constraints, scoring, i)
        })
        .collect();

    let cancelled = cancellation.is_cancelled();

    results.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    for (rank, r) in results.iter_mut().enumerate() {
        r.rank = rank + 1;
    }

    debug!(valid = results.iter().filter(|r| r.valid).count(), total = results.len(), cancelled, "grid search complete");
    Ok(GridResult { results, cancelled })
}

fn evaluate_combination(
    series: &OhlcvSeries,
    registry: &StrategyRegistry,
    strategy_name: &str,
    params: &ParamMap,
    sim_config: SimConfig,
    constraints: GridConstraints,
    scoring: ScoringKind,
    insertion_index: usize,
) -> GridCombinationResult {
    let outcome = (|| -> Result<Metrics, CoreError> {
        let strategy = registry.build(strategy_name, params)?;
        let signals = strategy.generate(series)?;
        let engine = BacktestEngine::new(sim_config)?;
        let output = engine.run(series, &signals)?;
        Ok(compute_metrics(&output.equity, &output.trades, series.interval, sim_config, None))
    })();

    match outcome {
        Ok(metrics) => {
            let valid = metrics.trades.total_trades >= constraints.min_trades
                && metrics.risk.max_drawdown_pct / 100.0 <= constraints.max_drawdown_limit;
            let s = if valid { score(&metrics, scoring) } else { f64::NEG_INFINITY };
            GridCombinationResult {
                insertion_index,
                rank: 0,
                params: params.clone(),
                valid,
                score: s,
                error: None,
                metrics: Some(metrics),
            }
        }
        Err(e) => {
            warn!(insertion_index, error = %e, "grid combination captured as invalid");
            GridCombinationResult {
                insertion_index,
                rank: 0,
                params: params.clone(),
                valid: false,
                score: f64::NEG_INFINITY,
                error: Some(e.to_string()),
                metrics: None,
            }
        }
    }
}
