//! Pure indicator kernels. Every function returns a series the same length
//! as its input, with `f64::NAN` standing in for the warm-up window —
//! callers that need bar-aligned signal streams (the C2 signal generator)
//! rely on this invariant instead of truncating output.

/// Simple rolling mean over window `p`. Undefined (NaN) for `i < p-1`.
pub fn sma(data: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if period == 0 || data.len() < period {
        return out;
    }
    let mut window_sum: f64 = data[..period].iter().sum();
    out[period - 1] = window_sum / period as f64;
    for i in period..data.len() {
        window_sum += data[i] - data[i - period];
        out[i] = window_sum / period as f64;
    }
    out
}

/// Rolling standard deviation over window `p`. `ddof` selects the
/// normalization: 0 (biased, population) is used for Bollinger Bands to
/// match common charting convention; 1 (unbiased, sample) is used for
/// Sharpe/Sortino denominators. Undefined (NaN) for `i < p-1`.
pub fn rolling_std(data: &[f64], period: usize, ddof: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if period == 0 || data.len() < period || period <= ddof {
        return out;
    }
    for i in period - 1..data.len() {
        let window = &data[i + 1 - period..=i];
        let mean = window.iter().sum::<f64>() / period as f64;
        let var =
            window.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (period - ddof) as f64;
        out[i] = var.sqrt();
    }
    out
}

/// Exponential moving average with span `s`. `alpha = 2 / (s + 1)`, no
/// "adjust" correction: a plain recursive form seeded from the first value,
/// so the output is defined from index 0.
pub fn ema(data: &[f64], span: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if data.is_empty() || span == 0 {
        return out;
    }
    let alpha = 2.0 / (span as f64 + 1.0);
    out[0] = data[0];
    for i in 1..data.len() {
        out[i] = alpha * data[i] + (1.0 - alpha) * out[i - 1];
    }
    out
}

/// Wilder's smoothed moving average (`alpha = 1/p`), recursive, seeded by
/// the simple mean of the first `p` values. Used by RSI. Undefined (NaN)
/// for `i < p-1`.
pub fn rma(data: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; data.len()];
    if period == 0 || data.len() < period {
        return out;
    }
    let seed = data[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = seed;
    for i in period..data.len() {
        out[i] = (out[i - 1] * (period - 1) as f64 + data[i]) / period as f64;
    }
    out
}

/// Relative Strength Index. `gain = max(delta, 0)`, `loss = max(-delta, 0)`,
/// smoothed by Wilder's RMA, `RS = avg_gain / avg_loss`,
/// `RSI = 100 - 100 / (1 + RS)`. When `avg_loss == 0`, RSI is defined as
/// 100. Undefined (NaN) for the first `period` bars (no prior delta at
/// index 0, plus the RMA warm-up).
pub fn rsi(data: &[f64], period: usize) -> Vec<f64> {
    let n = data.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period + 1 {
        return out;
    }

    let mut gains = vec![0.0; n];
    let mut losses = vec![0.0; n];
    for i in 1..n {
        let delta = data[i] - data[i - 1];
        gains[i] = delta.max(0.0);
        losses[i] = (-delta).max(0.0);
    }

    // RMA over gains[1..]/losses[1..], aligned back into the full series.
    let avg_gain = rma(&gains[1..], period);
    let avg_loss = rma(&losses[1..], period);

    for i in 0..avg_gain.len() {
        let ag = avg_gain[i];
        let al = avg_loss[i];
        if ag.is_nan() || al.is_nan() {
            continue;
        }
        let idx = i + 1;
        out[idx] = if al == 0.0 {
            100.0
        } else {
            let rs = ag / al;
            100.0 - 100.0 / (1.0 + rs)
        };
    }
    out
}

pub struct MacdResult {
    pub macd_line: Vec<f64>,
    pub signal_line: Vec<f64>,
    pub histogram: Vec<f64>,
}

/// MACD: `ema(fast) - ema(slow)`, signal = `ema(signal_period)` of the MACD
/// line. No artificial warm-up beyond the natural EMA seed (spec §4.2).
pub fn macd(data: &[f64], fast: usize, slow: usize, signal: usize) -> MacdResult {
    let ema_fast = ema(data, fast);
    let ema_slow = ema(data, slow);
    let macd_line: Vec<f64> = ema_fast
        .iter()
        .zip(ema_slow.iter())
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema(&macd_line, signal);
    let histogram: Vec<f64> = macd_line
        .iter()
        .zip(signal_line.iter())
        .map(|(m, s)| m - s)
        .collect();
    MacdResult {
        macd_line,
        signal_line,
        histogram,
    }
}

pub struct BollingerBands {
    pub upper: Vec<f64>,
    pub middle: Vec<f64>,
    pub lower: Vec<f64>,
}

/// Bollinger Bands. Biased (ddof=0) standard deviation, matching the common
/// charting convention (spec §4.1, §9).
pub fn bollinger_bands(data: &[f64], period: usize, num_std: f64) -> BollingerBands {
    let middle = sma(data, period);
    let std = rolling_std(data, period, 0);
    let upper: Vec<f64> = middle
        .iter()
        .zip(std.iter())
        .map(|(m, s)| m + num_std * s)
        .collect();
    let lower: Vec<f64> = middle
        .iter()
        .zip(std.iter())
        .map(|(m, s)| m - num_std * s)
        .collect();
    BollingerBands {
        upper,
        middle,
        lower,
    }
}

/// `cross_above(a, b)` is true at `i` iff `a[i-1] <= b[i-1]` and
/// `a[i] > b[i]`. The first bar's crossover is always false; NaN
/// comparisons are false by IEEE 754 semantics, so undefined indicator
/// values never spuriously produce a cross.
pub fn cross_above(a: &[f64], b: &[f64]) -> Vec<bool> {
    let n = a.len().min(b.len());
    let mut out = vec![false; n];
    for i in 1..n {
        out[i] = a[i - 1] <= b[i - 1] && a[i] > b[i];
    }
    out
}

/// Symmetric counterpart of [`cross_above`].
pub fn cross_below(a: &[f64], b: &[f64]) -> Vec<bool> {
    let n = a.len().min(b.len());
    let mut out = vec![false; n];
    for i in 1..n {
        out[i] = a[i - 1] >= b[i - 1] && a[i] < b[i];
    }
    out
}
