use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cooperative cancellation flag for the optimizer drivers (spec §5).
///
/// Checked between independent units of work — grid combinations, WFO
/// periods, Monte Carlo draws — never inside the per-bar simulator loop.
/// A thread-shared generalization of the teacher's `circuit_breaker.rs`
/// halt flag, needed here because grid/WFO evaluation runs on a `rayon`
/// pool.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}
