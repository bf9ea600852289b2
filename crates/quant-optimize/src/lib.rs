pub mod cancellation;
pub mod grid;
pub mod monte_carlo;
pub mod scoring;
pub mod space;
pub mod walk_forward;

pub use cancellation::CancellationToken;
pub use grid::{run_grid, GridCombinationResult, GridConstraints, GridResult};
pub use monte_carlo::{run_monte_carlo, McConfig, McResult};
pub use scoring::{score, ScoringKind};
pub use space::{ParameterRange, ParameterSpace};
pub use walk_forward::{run_walk_forward, ParameterStability, WfoConfig, WfoPeriod, WfoResult, WindowMode};
