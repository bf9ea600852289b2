use std::collections::HashMap;

use quant_core::CoreError;

use crate::catalog::{
    bollinger_from_params, dca_from_params, grid_from_params, macd_from_params, martingale_from_params,
    rsi_from_params, sma_crossover_from_params, StrategyKind,
};
use crate::params::ParamMap;

type Constructor = fn(&ParamMap) -> Result<StrategyKind, CoreError>;

/// String-keyed lookup for user-facing strategy selection (config files,
/// CLI flags, grid search parameter sweeps). The catalog itself is a
/// closed sum type; this registry is the only place a strategy name is
/// resolved dynamically.
pub struct StrategyRegistry {
    constructors: HashMap<String, Constructor>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        let mut constructors: HashMap<String, Constructor> = HashMap::new();
        constructors.insert("sma_crossover".to_string(), sma_crossover_from_params);
        constructors.insert("rsi".to_string(), rsi_from_params);
        constructors.insert("macd".to_string(), macd_from_params);
        constructors.insert("bollinger_mean_reversion".to_string(), bollinger_from_params);
        constructors.insert("bollinger".to_string(), bollinger_from_params);
        constructors.insert("grid".to_string(), grid_from_params);
        constructors.insert("dca".to_string(), dca_from_params);
        constructors.insert("martingale".to_string(), martingale_from_params);
        Self { constructors }
    }

    pub fn register(&mut self, name: impl Into<String>, constructor: Constructor) {
        self.constructors.insert(name.into(), constructor);
    }

    pub fn build(&self, name: &str, params: &ParamMap) -> Result<StrategyKind, CoreError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| CoreError::ValidationError(format!("unknown strategy kind '{name}'")))?;
        constructor(params)
    }

    pub fn names(&self) -> Vec<&str> {
        self.constructors.keys().map(String::as_str).collect()
    }
}

impl Default for StrategyRegistry {
    fn default() -> Self {
        Self::new()
    }
}
