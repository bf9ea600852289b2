use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::CoreError;
use crate::types::{Interval, OhlcvSeries};

/// External collaborator that supplies candle data for a symbol/interval/
/// time range (spec §6). On missing data it returns an empty series —
/// never raises.
#[async_trait]
pub trait OhlcvProvider: Send + Sync {
    async fn get_candles(
        &self,
        symbol: &str,
        interval: Interval,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<OhlcvSeries, CoreError>;
}

/// Used only by the metrics calculator for annualization when the series
/// itself lacks an interval hint.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
