use rand::distributions::{Distribution, Uniform};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rayon::prelude::*;
use tracing::{info, warn};

use quant_core::CoreError;

use crate::cancellation::CancellationToken;

/// Monte Carlo configuration (spec §6's `MCConfig`).
#[derive(Debug, Clone, Copy)]
pub struct McConfig {
    pub n_simulations: usize,
    /// Percent drawdown, in `(0, 100)`, beyond which a simulated path
    /// counts toward `probability_of_ruin`.
    pub ruin_threshold: f64,
    pub random_seed: Option<u64>,
}

impl McConfig {
    fn validate(&self) -> Result<(), CoreError> {
        if self.n_simulations < 10 {
            return Err(CoreError::ConfigError("n_simulations must be >= 10".into()));
        }
        if !(0.0 < self.ruin_threshold && self.ruin_threshold < 100.0) {
            return Err(CoreError::ConfigError("ruin_threshold must be in (0, 100)".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct McResult {
    pub simulations: usize,
    pub mean_return: f64,
    pub std_return: f64,
    pub percentile_5: f64,
    pub percentile_25: f64,
    pub median_return: f64,
    pub percentile_75: f64,
    pub percentile_95: f64,
    pub probability_of_profit: f64,
    pub probability_of_ruin: f64,
    /// Where the original (un-resampled) trade sequence's total return
    /// falls within the simulated distribution, in `[0, 100]`.
    pub original_percentile_rank: f64,
    pub return_distribution: Vec<f64>,
    pub drawdown_distribution: Vec<f64>,
    pub cancelled: bool,
}

fn empty_result() -> McResult {
    McResult {
        simulations: 0,
        mean_return: 0.0,
        std_return: 0.0,
        percentile_5: 0.0,
        percentile_25: 0.0,
        median_return: 0.0,
        percentile_75: 0.0,
        percentile_95: 0.0,
        probability_of_profit: 0.0,
        probability_of_ruin: 0.0,
        original_percentile_rank: 0.0,
        return_distribution: Vec::new(),
        drawdown_distribution: Vec::new(),
        cancelled: false,
    }
}

/// One simulated path: draw `trade_pnls.len()` indices with replacement
/// (bootstrap, not a permutation — spec §4.7 / §8 property #7) and compound
/// them onto `initial_capital` in draw order.
fn simulate_one(trade_pnls: &[f64], initial_capital: f64, seed: u64) -> (f64, f64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let dist = Uniform::from(0..trade_pnls.len());

    let mut capital = initial_capital;
    let mut peak = initial_capital;
    let mut max_dd = 0.0_f64;

    for _ in 0..trade_pnls.len() {
        let idx = dist.sample(&mut rng);
        capital += trade_pnls[idx];
        peak = peak.max(capital);
        if peak > 0.0 {
            max_dd = max_dd.max((peak - capital) / peak * 100.0);
        }
    }

    let total_return_pct = if initial_capital > 0.0 { (capital / initial_capital - 1.0) * 100.0 } else { 0.0 };
    (total_return_pct, max_dd)
}

fn percentile(sorted: &[f64], p: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = ((p / 100.0) * (sorted.len() - 1) as f64).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn sample_distribution(sorted: &[f64], max_points: usize) -> Vec<f64> {
    if sorted.len() <= max_points {
        return sorted.to_vec();
    }
    let step = sorted.len() as f64 / max_points as f64;
    (0..max_points).map(|i| sorted[(i as f64 * step) as usize]).collect()
}

/// Runs `config.n_simulations` bootstrap draws over `trade_pnls` and
/// derives the return/drawdown distribution (spec §4.7). Each draw is
/// seeded independently (`random_seed` offset by draw index, or an
/// entropy-derived base when unset) so the computation is both
/// `rayon`-parallel and exactly reproducible for a fixed seed.
pub fn run_monte_carlo(
    trade_pnls: &[f64],
    initial_capital: f64,
    config: McConfig,
    cancellation: &CancellationToken,
) -> Result<McResult, CoreError> {
    config.validate()?;

    info!(n_simulations = config.n_simulations, trades = trade_pnls.len(), "starting monte carlo batch");

    if trade_pnls.is_empty() {
        warn!("monte carlo batch called with an empty trade log, returning an empty result");
        return Ok(empty_result());
    }

    let base_seed = config.random_seed.unwrap_or_else(|| {
        use rand::RngCore;
        StdRng::from_entropy().next_u64()
    });

    let original_return = if initial_capital > 0.0 {
        trade_pnls.iter().sum::<f64>() / initial_capital * 100.0
    } else {
        0.0
    };

    let draws: Vec<Option<(f64, f64)>> = (0..config.n_simulations)
        .into_par_iter()
        .map(|i| {
            if cancellation.is_cancelled() {
                return None;
            }
            Some(simulate_one(trade_pnls, initial_capital, base_seed.wrapping_add(i as u64)))
        })
        .collect();

    let cancelled = cancellation.is_cancelled();
    let mut returns: Vec<f64> = Vec::with_capacity(draws.len());
    let mut drawdowns: Vec<f64> = Vec::with_capacity(draws.len());
    for draw in draws.into_iter().flatten() {
        returns.push(draw.0);
        drawdowns.push(draw.1);
    }

    if returns.is_empty() {
        warn!("monte carlo batch cancelled before any draw completed");
        let mut result = empty_result();
        result.cancelled = cancelled;
        return Ok(result);
    }

    returns.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    drawdowns.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let n = returns.len() as f64;
    let mean_return = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean_return).powi(2)).sum::<f64>() / n;
    let std_return = variance.sqrt();

    let profitable = returns.iter().filter(|&&r| r > 0.0).count();
    let ruined = drawdowns.iter().filter(|&&d| d >= config.ruin_threshold).count();
    let below_original = returns.iter().filter(|&&r| r <= original_return).count();

    info!(
        simulations = returns.len(),
        mean_return,
        probability_of_ruin = ruined as f64 / n * 100.0,
        cancelled,
        "monte carlo batch complete"
    );

    Ok(McResult {
        simulations: returns.len(),
        mean_return,
        std_return,
        percentile_5: percentile(&returns, 5.0),
        percentile_25: percentile(&returns, 25.0),
        median_return: percentile(&returns, 50.0),
        percentile_75: percentile(&returns, 75.0),
        percentile_95: percentile(&returns, 95.0),
        probability_of_profit: profitable as f64 / n * 100.0,
        probability_of_ruin: ruined as f64 / n * 100.0,
        original_percentile_rank: below_original as f64 / n * 100.0,
        return_distribution: sample_distribution(&returns, 200),
        drawdown_distribution: sample_distribution(&drawdowns, 200),
        cancelled,
    })
}
