//! Bridge error taxonomy.
//!
//! Protocol and conversion errors are local and synchronous to the
//! caller. Foreign-side exceptions raised inside write callbacks never
//! propagate: the adapters convert them into host diagnostics, because a
//! failing write must not crash a read elsewhere. Nothing here ever
//! terminates the host process.

use foreign_runtime::ForeignError;
use thiserror::Error;

/// Errors surfaced by bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The name does not satisfy the reserved-prefix identifier rule
    #[error(
        "invalid special identifier: it must be a valid variable name starting \
         with \"zembed\" (ignoring case) and containing at least one more character"
    )]
    NameInvalid,

    /// The name already denotes a host variable of some kind
    #[error("parameter `{0}` already exists")]
    NameExists(String),

    /// The backing object lacks the protocol the declared kind requires
    #[error("object must implement the {0} protocol")]
    WrongProtocol(&'static str),

    /// A value could not be converted into the target representation
    #[error("conversion failed: {0}")]
    Conversion(String),

    /// A foreign-side exception propagated to the immediate caller
    #[error(transparent)]
    Foreign(#[from] ForeignError),

    /// The single-owner capture scan slot is already occupied
    #[error(
        "capture scan already in flight: the host table scanner has a single \
         owner, do not capture two hashes simultaneously"
    )]
    ScanConflict,

    /// An internal invariant was violated
    #[error("consistency error: {0}")]
    Consistency(String),

    /// No host variable with that name
    #[error("no such parameter `{0}`")]
    NotFound(String),
}

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;
