use proptest::prelude::*;

use crate::kernels::{bollinger_bands, cross_above, cross_below, ema, macd, rma, rolling_std, rsi, sma};

#[test]
fn sma_pads_warmup_with_nan() {
    let data = [1.0, 2.0, 3.0, 4.0, 5.0];
    let out = sma(&data, 3);
    assert!(out[0].is_nan());
    assert!(out[1].is_nan());
    assert_eq!(out[2], 2.0);
    assert_eq!(out[3], 3.0);
    assert_eq!(out[4], 4.0);
}

#[test]
fn sma_same_length_as_input() {
    let data = [1.0; 10];
    assert_eq!(sma(&data, 4).len(), data.len());
}

#[test]
fn rolling_std_ddof_changes_denominator() {
    let data = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
    let pop = rolling_std(&data, 8, 0)[7];
    let sample = rolling_std(&data, 8, 1)[7];
    assert!(sample > pop);
}

#[test]
fn ema_seeds_from_first_value() {
    let data = [10.0, 20.0, 30.0];
    let out = ema(&data, 2);
    assert_eq!(out[0], 10.0);
    // alpha = 2/3
    let expected = (2.0 / 3.0) * 20.0 + (1.0 / 3.0) * 10.0;
    assert!((out[1] - expected).abs() < 1e-9);
}

#[test]
fn rma_seeds_with_simple_mean() {
    let data = [1.0, 2.0, 3.0, 4.0];
    let out = rma(&data, 2);
    assert!(out[0].is_nan());
    assert_eq!(out[1], 1.5);
    assert_eq!(out[2], (1.5 * 1.0 + 3.0) / 2.0);
}

#[test]
fn rsi_is_100_when_no_losses() {
    let data: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
    let out = rsi(&data, 14);
    let last = *out.last().unwrap();
    assert!((last - 100.0).abs() < 1e-9);
}

#[test]
fn rsi_undefined_region_is_nan() {
    let data: Vec<f64> = (0..20).map(|i| 100.0 + (i as f64).sin()).collect();
    let out = rsi(&data, 14);
    assert!(out[0].is_nan());
    assert!(out[13].is_nan());
}

#[test]
fn macd_histogram_is_macd_minus_signal() {
    let data: Vec<f64> = (0..50).map(|i| 100.0 + (i as f64 * 0.3).sin() * 5.0).collect();
    let result = macd(&data, 12, 26, 9);
    for i in 0..data.len() {
        let expected = result.macd_line[i] - result.signal_line[i];
        assert!((result.histogram[i] - expected).abs() < 1e-9);
    }
}

#[test]
fn bollinger_upper_above_lower_when_defined() {
    let data: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64 * 0.5).cos() * 3.0).collect();
    let bands = bollinger_bands(&data, 20, 2.0);
    for i in 19..data.len() {
        assert!(bands.upper[i] >= bands.middle[i]);
        assert!(bands.middle[i] >= bands.lower[i]);
    }
}

#[test]
fn cross_above_requires_strict_crossing() {
    let a = vec![1.0, 1.0, 2.0, 2.0];
    let b = vec![2.0, 1.0, 1.0, 2.0];
    let crosses = cross_above(&a, &b);
    // i=1: a[0]=1<=b[0]=2, a[1]=1>b[1]=1? false (equal doesn't cross)
    assert!(!crosses[1]);
    // i=2: a[1]=1<=b[1]=1, a[2]=2>b[2]=1 -> true
    assert!(crosses[2]);
    // i=3: equal values, no cross
    assert!(!crosses[3]);
}

#[test]
fn cross_below_is_mirror_of_cross_above() {
    let a = vec![2.0, 1.0, 0.0];
    let b = vec![0.0, 1.0, 2.0];
    let above = cross_above(&b, &a);
    let below = cross_below(&a, &b);
    assert_eq!(above, below);
}

proptest! {
    // Spec universal property #10: cross_above never fires on the first bar
    // and never fires on equal values.
    #[test]
    fn cross_above_first_bar_always_false(
        a in proptest::collection::vec(-1000.0f64..1000.0, 1..50),
        b in proptest::collection::vec(-1000.0f64..1000.0, 1..50),
    ) {
        let crosses = cross_above(&a, &b);
        if !crosses.is_empty() {
            prop_assert!(!crosses[0]);
        }
    }

    #[test]
    fn cross_above_and_cross_below_are_mutually_exclusive(
        a in proptest::collection::vec(-1000.0f64..1000.0, 2..50),
        b in proptest::collection::vec(-1000.0f64..1000.0, 2..50),
    ) {
        let n = a.len().min(b.len());
        let above = cross_above(&a[..n], &b[..n]);
        let below = cross_below(&a[..n], &b[..n]);
        for i in 0..n {
            prop_assert!(!(above[i] && below[i]));
        }
    }

    #[test]
    fn sma_output_length_matches_input(
        data in proptest::collection::vec(-1000.0f64..1000.0, 0..40),
        period in 1usize..10,
    ) {
        prop_assert_eq!(sma(&data, period).len(), data.len());
    }
}
