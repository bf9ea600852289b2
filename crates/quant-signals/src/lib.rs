pub mod catalog;
pub mod graph;
pub mod params;
pub mod registry;

pub use catalog::{
    BollingerParams, DcaParams, GridParams, MacdParams, MartingaleParams, RsiParams, SmaCrossoverParams,
    StrategyKind,
};
pub use graph::{NodeKind, PortType, StrategyGraph};
pub use params::{ParamMap, ParamValue};
pub use registry::StrategyRegistry;

#[cfg(test)]
mod tests;
