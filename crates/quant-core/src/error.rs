use thiserror::Error;

/// Errors surfaced at the engine boundary.
///
/// `ConfigError` and `ValidationError` are raised synchronously before any
/// simulation work begins. `InsufficientDataError` covers windows that are
/// longer than the data they're drawn from. `InternalError` is reserved for
/// bugs — a conformant run should never emit it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("config error: {0}")]
    ConfigError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("insufficient data: {0}")]
    InsufficientDataError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
