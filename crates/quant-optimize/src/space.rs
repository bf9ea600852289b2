use quant_core::CoreError;
use quant_signals::{ParamMap, ParamValue};

/// A single parameter's search domain: an explicit value list, or an
/// arithmetic `{start, stop, step}` range (spec §6). The range form is
/// reintroduced from `original_source/backend/optimization/walk_forward.py`'s
/// `ParameterRange` — the teacher's own search space only supports lists.
#[derive(Debug, Clone)]
pub enum ParameterRange {
    Values(Vec<f64>),
    Range { start: f64, stop: f64, step: f64 },
}

impl ParameterRange {
    fn materialize(&self) -> Result<Vec<f64>, CoreError> {
        match self {
            ParameterRange::Values(values) => {
                if values.is_empty() {
                    return Err(CoreError::ConfigError("parameter value list must not be empty".into()));
                }
                Ok(values.clone())
            }
            ParameterRange::Range { start, stop, step } => {
                if *step <= 0.0 {
                    return Err(CoreError::ConfigError("parameter range step must be positive".into()));
                }
                if stop < start {
                    return Err(CoreError::ConfigError("parameter range stop must be >= start".into()));
                }
                let mut values = Vec::new();
                let mut v = *start;
                while v <= stop + step * 1e-9 {
                    values.push(v);
                    v += step;
                }
                Ok(values)
            }
        }
    }
}

/// Ordered name → domain map defining a grid/walk-forward search (spec
/// §4.5/§6). Order is preserved in insertion order so the cartesian
/// product is reproducible.
#[derive(Debug, Clone, Default)]
pub struct ParameterSpace {
    entries: Vec<(String, ParameterRange)>,
}

impl ParameterSpace {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn with(mut self, name: impl Into<String>, range: ParameterRange) -> Self {
        self.entries.push((name.into(), range));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Enumerates the full cartesian product as parameter maps, in a
    /// deterministic order (spec §4.5: ordering is stable regardless of
    /// evaluation order downstream).
    pub fn cartesian_product(&self) -> Result<Vec<ParamMap>, CoreError> {
        if self.entries.is_empty() {
            return Err(CoreError::ConfigError("parameter space must not be empty".into()));
        }
        let mut domains = Vec::with_capacity(self.entries.len());
        for (name, range) in &self.entries {
            domains.push((name.clone(), range.materialize()?));
        }

        let mut combos: Vec<ParamMap> = vec![ParamMap::new()];
        for (name, values) in domains {
            let mut next = Vec::with_capacity(combos.len() * values.len());
            for combo in &combos {
                for &value in &values {
                    let mut extended = combo.clone();
                    extended.insert(name.clone(), ParamValue::Number(value));
                    next.push(extended);
                }
            }
            combos = next;
        }
        Ok(combos)
    }
}
