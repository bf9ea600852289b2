//! Declarative strategy graph: a DAG of indicator and condition nodes,
//! compiled to the same four-stream signal contract as the built-in
//! strategy kinds. Node indices are plain `Vec` offsets; edges point
//! strictly backward (a node may only reference an earlier index), which
//! makes the graph trivially acyclic and lets evaluation walk the node
//! list once, front to back, caching each node's output series.

use quant_core::{CoreError, OhlcvSeries};
use quant_indicators::{cross_above, cross_below, ema, rsi, sma};

#[derive(Debug, Clone)]
pub enum NodeKind {
    Open,
    High,
    Low,
    Close,
    Constant(f64),
    Sma { input: usize, period: usize },
    Ema { input: usize, period: usize },
    Rsi { input: usize, period: usize },
    CrossAbove { a: usize, b: usize },
    CrossBelow { a: usize, b: usize },
    GreaterThan { a: usize, b: usize },
    LessThan { a: usize, b: usize },
    And { a: usize, b: usize },
    Or { a: usize, b: usize },
    Not { a: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortType {
    Price,
    Number,
    Boolean,
}

/// `Price` and `Number` are interchangeable wherever a node wants a
/// numeric series; only `Boolean` is distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PortCategory {
    Numeric,
    Boolean,
}

impl PortType {
    fn category(self) -> PortCategory {
        match self {
            PortType::Price | PortType::Number => PortCategory::Numeric,
            PortType::Boolean => PortCategory::Boolean,
        }
    }
}

#[derive(Debug, Clone)]
enum Series {
    Numeric(Vec<f64>),
    Boolean(Vec<bool>),
}

impl Series {
    fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Series::Numeric(v) => Some(v),
            Series::Boolean(_) => None,
        }
    }

    fn as_boolean(&self) -> Option<&[bool]> {
        match self {
            Series::Boolean(v) => Some(v),
            Series::Numeric(_) => None,
        }
    }
}

impl NodeKind {
    fn port_type(&self) -> PortType {
        match self {
            NodeKind::Open | NodeKind::High | NodeKind::Low | NodeKind::Close => PortType::Price,
            NodeKind::Constant(_) | NodeKind::Sma { .. } | NodeKind::Ema { .. } | NodeKind::Rsi { .. } => {
                PortType::Number
            }
            NodeKind::CrossAbove { .. }
            | NodeKind::CrossBelow { .. }
            | NodeKind::GreaterThan { .. }
            | NodeKind::LessThan { .. }
            | NodeKind::And { .. }
            | NodeKind::Or { .. }
            | NodeKind::Not { .. } => PortType::Boolean,
        }
    }

    fn inputs(&self) -> Vec<usize> {
        match *self {
            NodeKind::Open | NodeKind::High | NodeKind::Low | NodeKind::Close | NodeKind::Constant(_) => {
                vec![]
            }
            NodeKind::Sma { input, .. } | NodeKind::Ema { input, .. } | NodeKind::Rsi { input, .. } => {
                vec![input]
            }
            NodeKind::CrossAbove { a, b }
            | NodeKind::CrossBelow { a, b }
            | NodeKind::GreaterThan { a, b }
            | NodeKind::LessThan { a, b }
            | NodeKind::And { a, b }
            | NodeKind::Or { a, b } => vec![a, b],
            NodeKind::Not { a } => vec![a],
        }
    }

    /// Port category each of [`Self::inputs`]'s slots expects, in the same
    /// order, so [`StrategyGraph::validate`] can reject a port mismatch
    /// before [`StrategyGraph::evaluate`] ever calls `.as_numeric()`/
    /// `.as_boolean()` on it.
    fn expected_input_categories(&self) -> Vec<PortCategory> {
        match self {
            NodeKind::Open | NodeKind::High | NodeKind::Low | NodeKind::Close | NodeKind::Constant(_) => {
                vec![]
            }
            NodeKind::Sma { .. } | NodeKind::Ema { .. } | NodeKind::Rsi { .. } => vec![PortCategory::Numeric],
            NodeKind::CrossAbove { .. } | NodeKind::CrossBelow { .. } | NodeKind::GreaterThan { .. } | NodeKind::LessThan { .. } => {
                vec![PortCategory::Numeric, PortCategory::Numeric]
            }
            NodeKind::And { .. } | NodeKind::Or { .. } => vec![PortCategory::Boolean, PortCategory::Boolean],
            NodeKind::Not { .. } => vec![PortCategory::Boolean],
        }
    }
}

/// A directed acyclic graph of indicator/condition nodes. `nodes[i]` may
/// only reference indices `< i` — this is checked by [`StrategyGraph::validate`]
/// and makes evaluation order trivial (front-to-back).
#[derive(Debug, Clone)]
pub struct StrategyGraph {
    pub nodes: Vec<NodeKind>,
    pub long_entry: usize,
    pub long_exit: usize,
    pub short_entry: usize,
    pub short_exit: usize,
}

impl StrategyGraph {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.nodes.is_empty() {
            return Err(CoreError::ConfigError("strategy graph has no nodes".into()));
        }
        for (i, node) in self.nodes.iter().enumerate() {
            let inputs = node.inputs();
            let expected = node.expected_input_categories();
            for (input, want) in inputs.iter().zip(expected.iter()) {
                if *input >= i {
                    return Err(CoreError::ValidationError(format!(
                        "node {i} references node {input}, which is not strictly earlier (cycle or forward edge)"
                    )));
                }
                let got = self.nodes[*input].port_type().category();
                if got != *want {
                    return Err(CoreError::ValidationError(format!(
                        "node {i} expects a {want:?} input at node {input}, but node {input} produces {got:?}"
                    )));
                }
            }
        }
        for (label, idx) in [
            ("long_entry", self.long_entry),
            ("long_exit", self.long_exit),
            ("short_entry", self.short_entry),
            ("short_exit", self.short_exit),
        ] {
            if idx >= self.nodes.len() {
                return Err(CoreError::ConfigError(format!("{label} references out-of-range node {idx}")));
            }
            if self.nodes[idx].port_type() != PortType::Boolean {
                return Err(CoreError::ConfigError(format!("{label} node must be boolean-typed")));
            }
        }
        Ok(())
    }

    /// Topologically evaluates every node exactly once (front-to-back
    /// order, guaranteed valid by [`validate`]) and reads off the four
    /// output streams from the designated nodes.
    pub fn evaluate(&self, series: &OhlcvSeries) -> Result<(Vec<bool>, Vec<bool>, Vec<bool>, Vec<bool>), CoreError> {
        self.validate()?;
        let n = series.len();
        let mut outputs: Vec<Series> = Vec::with_capacity(self.nodes.len());

        for node in &self.nodes {
            let value = match node {
                NodeKind::Open => Series::Numeric(series.opens()),
                NodeKind::High => Series::Numeric(series.highs()),
                NodeKind::Low => Series::Numeric(series.lows()),
                NodeKind::Close => Series::Numeric(series.closes()),
                NodeKind::Constant(c) => Series::Numeric(vec![*c; n]),
                NodeKind::Sma { input, period } => {
                    let src = outputs[*input].as_numeric().unwrap();
                    Series::Numeric(sma(src, *period))
                }
                NodeKind::Ema { input, period } => {
                    let src = outputs[*input].as_numeric().unwrap();
                    Series::Numeric(ema(src, *period))
                }
                NodeKind::Rsi { input, period } => {
                    let src = outputs[*input].as_numeric().unwrap();
                    Series::Numeric(rsi(src, *period))
                }
                NodeKind::CrossAbove { a, b } => {
                    let a = outputs[*a].as_numeric().unwrap();
                    let b = outputs[*b].as_numeric().unwrap();
                    Series::Boolean(cross_above(a, b))
                }
                NodeKind::CrossBelow { a, b } => {
                    let a = outputs[*a].as_numeric().unwrap();
                    let b = outputs[*b].as_numeric().unwrap();
                    Series::Boolean(cross_below(a, b))
                }
                NodeKind::GreaterThan { a, b } => {
                    let a = outputs[*a].as_numeric().unwrap();
                    let b = outputs[*b].as_numeric().unwrap();
                    Series::Boolean(a.iter().zip(b).map(|(x, y)| x > y).collect())
                }
                NodeKind::LessThan { a, b } => {
                    let a = outputs[*a].as_numeric().unwrap();
                    let b = outputs[*b].as_numeric().unwrap();
                    Series::Boolean(a.iter().zip(b).map(|(x, y)| x < y).collect())
                }
                NodeKind::And { a, b } => {
                    let a = outputs[*a].as_boolean().unwrap();
                    let b = outputs[*b].as_boolean().unwrap();
                    Series::Boolean(a.iter().zip(b).map(|(x, y)| *x && *y).collect())
                }
                NodeKind::Or { a, b } => {
                    let a = outputs[*a].as_boolean().unwrap();
                    let b = outputs[*b].as_boolean().unwrap();
                    Series::Boolean(a.iter().zip(b).map(|(x, y)| *x || *y).collect())
                }
                NodeKind::Not { a } => {
                    let a = outputs[*a].as_boolean().unwrap();
                    Series::Boolean(a.iter().map(|x| !x).collect())
                }
            };
            outputs.push(value);
        }

        let read = |idx: usize| -> Vec<bool> { outputs[idx].as_boolean().unwrap().to_vec() };
        Ok((
            read(self.long_entry),
            read(self.long_exit),
            read(self.short_entry),
            read(self.short_exit),
        ))
    }
}
