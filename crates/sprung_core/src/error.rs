//! Animation error types

use thiserror::Error;

/// Errors raised by misconfigured animations
///
/// Most of these are programmer errors. The engine's infallible entry points
/// (`start`, `Spring::new`, ...) panic with this message; the `try_*` variants
/// hand it back instead.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    /// Started or baked before a current value was set
    #[error("animator has no current value; set a value before starting")]
    MissingValue,

    /// Started or baked before a target was set
    #[error("animator has no target; set a target before starting")]
    MissingTarget,

    /// Start delay was negative or not finite
    #[error("start delay must be a finite, non-negative number of seconds (got {0})")]
    NegativeDelay(f64),

    /// A spring parameter is out of range
    #[error("invalid spring parameter `{parameter}`: {value}")]
    InvalidSpring {
        parameter: &'static str,
        value: f64,
    },

    /// Baking sample rate was zero, negative or not finite
    #[error("sample rate must be a positive, finite number of samples per second (got {0})")]
    InvalidSampleRate(f64),

    /// Baking would produce more samples than the trajectory limit
    #[error("trajectory needs {samples} samples, more than the limit of {limit}")]
    TooManySamples { samples: f64, limit: usize },

    /// Baking a spring whose settling duration is unbounded
    #[error("spring never settles (settling duration is {0})")]
    NeverSettles(f64),
}

/// Result type for animation operations
pub type Result<T> = std::result::Result<T, AnimationError>;
