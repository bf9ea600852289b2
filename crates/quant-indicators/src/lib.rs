pub mod kernels;

pub use kernels::{
    bollinger_bands, cross_above, cross_below, ema, macd, rma, rolling_std, rsi, sma,
    BollingerBands, MacdResult,
};

#[cfg(test)]
mod tests;
