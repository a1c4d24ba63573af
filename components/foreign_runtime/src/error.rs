//! Foreign-side exception model.

use thiserror::Error;

/// An exception raised by the foreign runtime.
///
/// The kinds mirror the exception classes a bridge caller has to tell
/// apart: a missing mapping key is ordinary control flow, everything else
/// is a failure the caller reports or propagates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ForeignError {
    /// An object does not support the requested protocol
    #[error("TypeError: {0}")]
    Type(String),
    /// A mapping lookup found no such key
    #[error("KeyError: {0}")]
    Key(String),
    /// A value has the right type but an unusable content
    #[error("ValueError: {0}")]
    Value(String),
    /// Any other runtime failure
    #[error("RuntimeError: {0}")]
    Runtime(String),
}

impl ForeignError {
    /// Whether this is the benign missing-key exception.
    pub fn is_key_error(&self) -> bool {
        matches!(self, ForeignError::Key(_))
    }
}

/// Result type for foreign runtime operations.
pub type ForeignResult<T> = Result<T, ForeignError>;
