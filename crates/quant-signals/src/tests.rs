use chrono::{TimeZone, Utc};
use proptest::prelude::*;
use quant_core::{Candle, Interval, OhlcvSeries};

use crate::catalog::{BollingerParams, MacdParams, RsiParams, SmaCrossoverParams, StrategyKind};
use crate::graph::{NodeKind, StrategyGraph};
use crate::params::{ParamMap, ParamValue};
use crate::registry::StrategyRegistry;

fn series_from_closes(closes: &[f64]) -> OhlcvSeries {
    let candles = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| Candle {
            timestamp: Utc.timestamp_opt(1_700_000_000 + i as i64 * 60, 0).unwrap(),
            open: c,
            high: c + 0.5,
            low: c - 0.5,
            close: c,
            volume: 1_000.0,
        })
        .collect();
    OhlcvSeries::new(Interval::OneMinute, candles).unwrap()
}

fn sma_crossover_graph(fast: usize, slow: usize) -> StrategyGraph {
    StrategyGraph {
        nodes: vec![
            NodeKind::Close,                                 // 0
            NodeKind::Sma { input: 0, period: fast },         // 1
            NodeKind::Sma { input: 0, period: slow },         // 2
            NodeKind::CrossAbove { a: 1, b: 2 },              // 3 = long_entry
            NodeKind::CrossBelow { a: 1, b: 2 },              // 4 = long_exit
        ],
        long_entry: 3,
        long_exit: 4,
        short_entry: 4,
        short_exit: 3,
    }
}

#[test]
fn sma_crossover_rejects_fast_not_less_than_slow() {
    let kind = StrategyKind::SmaCrossover(SmaCrossoverParams {
        fast_period: 20,
        slow_period: 10,
    });
    assert!(kind.validate().is_err());
}

#[test]
fn rsi_rejects_bad_thresholds() {
    let kind = StrategyKind::Rsi(RsiParams {
        period: 14,
        oversold: 80.0,
        overbought: 20.0,
    });
    assert!(kind.validate().is_err());
}

#[test]
fn macd_rejects_fast_not_less_than_slow() {
    let kind = StrategyKind::Macd(MacdParams {
        fast: 26,
        slow: 12,
        signal: 9,
    });
    assert!(kind.validate().is_err());
}

#[test]
fn bollinger_rejects_nonpositive_num_std() {
    let kind = StrategyKind::BollingerMeanReversion(BollingerParams {
        period: 20,
        num_std: 0.0,
    });
    assert!(kind.validate().is_err());
}

#[test]
fn registry_resolves_known_strategy_names() {
    let registry = StrategyRegistry::new();
    let mut params = ParamMap::new();
    params.insert("fast_period".into(), ParamValue::Integer(5));
    params.insert("slow_period".into(), ParamValue::Integer(20));
    let kind = registry.build("sma_crossover", &params).unwrap();
    assert!(matches!(kind, StrategyKind::SmaCrossover(_)));
}

#[test]
fn registry_rejects_unknown_strategy_name() {
    let registry = StrategyRegistry::new();
    let params = ParamMap::new();
    assert!(registry.build("not_a_real_strategy", &params).is_err());
}

#[test]
fn graph_rejects_forward_reference() {
    let graph = StrategyGraph {
        nodes: vec![NodeKind::Close, NodeKind::CrossAbove { a: 0, b: 2 }, NodeKind::Close],
        long_entry: 1,
        long_exit: 1,
        short_entry: 1,
        short_exit: 1,
    };
    assert!(graph.validate().is_err());
}

#[test]
fn graph_rejects_non_boolean_output_port() {
    let graph = StrategyGraph {
        nodes: vec![NodeKind::Close, NodeKind::Sma { input: 0, period: 5 }],
        long_entry: 1,
        long_exit: 1,
        short_entry: 1,
        short_exit: 1,
    };
    assert!(graph.validate().is_err());
}

#[test]
fn graph_rejects_numeric_node_fed_a_boolean_input() {
    // node 2 (`Sma`) wants a numeric input but node 1 (`CrossAbove`)
    // produces a boolean series — a backward-edge-valid graph that would
    // otherwise panic in `evaluate` on `.as_numeric().unwrap()`.
    let graph = StrategyGraph {
        nodes: vec![
            NodeKind::Close,
            NodeKind::CrossAbove { a: 0, b: 0 },
            NodeKind::Sma { input: 1, period: 5 },
        ],
        long_entry: 1,
        long_exit: 1,
        short_entry: 1,
        short_exit: 1,
    };
    assert!(graph.validate().is_err());
}

#[test]
fn graph_rejects_boolean_node_fed_a_numeric_input() {
    let graph = StrategyGraph {
        nodes: vec![NodeKind::Close, NodeKind::Not { a: 0 }],
        long_entry: 1,
        long_exit: 1,
        short_entry: 1,
        short_exit: 1,
    };
    assert!(graph.validate().is_err());
}

#[test]
fn generate_signals_are_all_false_on_empty_series() {
    let series = series_from_closes(&[]);
    let kind = StrategyKind::SmaCrossover(SmaCrossoverParams {
        fast_period: 3,
        slow_period: 5,
    });
    let signals = kind.generate(&series).unwrap();
    assert_eq!(signals.len(), 0);
}

proptest! {
    // Spec §4.2: the graph compiler is required to produce identical
    // output to a handwritten equivalent strategy, for every bar.
    #[test]
    fn graph_built_sma_crossover_matches_native(
        closes in proptest::collection::vec(1.0f64..1000.0, 30..120),
    ) {
        let series = series_from_closes(&closes);
        let native = StrategyKind::SmaCrossover(SmaCrossoverParams {
            fast_period: 5,
            slow_period: 20,
        });
        let native_signals = native.generate(&series).unwrap();

        let graph = StrategyKind::Custom(sma_crossover_graph(5, 20));
        let graph_signals = graph.generate(&series).unwrap();

        prop_assert_eq!(native_signals.long_entries, graph_signals.long_entries);
        prop_assert_eq!(native_signals.long_exits, graph_signals.long_exits);
        prop_assert_eq!(native_signals.short_entries, graph_signals.short_entries);
        prop_assert_eq!(native_signals.short_exits, graph_signals.short_exits);
    }

    // Spec §8 universal property: no look-ahead. Truncating the series to
    // i+1 bars must not change any signal at index <= i.
    #[test]
    fn sma_crossover_has_no_lookahead(
        closes in proptest::collection::vec(1.0f64..1000.0, 30..80),
        cut in 20usize..29,
    ) {
        let full = series_from_closes(&closes);
        let truncated = series_from_closes(&closes[..=cut]);
        let kind = StrategyKind::SmaCrossover(SmaCrossoverParams {
            fast_period: 5,
            slow_period: 20,
        });
        let full_signals = kind.generate(&full).unwrap();
        let truncated_signals = kind.generate(&truncated).unwrap();
        for i in 0..=cut {
            prop_assert_eq!(full_signals.long_entries[i], truncated_signals.long_entries[i]);
            prop_assert_eq!(full_signals.long_exits[i], truncated_signals.long_exits[i]);
        }
    }
}
