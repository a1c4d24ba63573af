//! The foreign variable bridge.
//!
//! A foreign-backed variable is a host variable whose storage is a proxy
//! to an object inside the embedded interpreter runtime. Reading it goes
//! through the object's string/numeric/iteration protocol, writing it
//! through the object's call or item-assignment protocol. This component
//! implements:
//!
//! - [`Bridge::declare`] - creation of foreign-backed variables of five
//!   kinds (string, integer, float, array, associative map)
//! - the lazy, per-key map view that makes a foreign mapping behave as a
//!   host associative variable without ever materializing a copy
//! - the encoding bridge between the host's metafied byte strings and
//!   foreign byte-string objects
//! - the execution-lock and fork-epoch discipline every boundary
//!   crossing observes ([`Bridge::enter`])
//! - the descriptor registry and the shutdown teardown protocol
//!   ([`Bridge::teardown`])
//! - the marshalling layer for ordinary (non-foreign-backed) values
//!   ([`marshal`])

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod descriptor;
pub mod encoding;
pub mod error;
pub mod marshal;
pub mod mapview;
pub mod registry;
pub mod state;
pub mod teardown;

pub use descriptor::{ForeignParam, VariableKind};
pub use error::{BridgeError, BridgeResult};
pub use state::{Bridge, CaptureGuard, ExecSession};

use host_types::MetaStr;

/// Reserved, case-insensitive name prefix for foreign-backed variables.
/// A declared name must carry it plus at least one more character.
pub const SPECIAL_PREFIX: &str = "zembed";

/// Host-side command execution, as seen from the foreign runtime.
///
/// The execution entry point itself lives with the embedder; implementors
/// run `source` as host code. The bridge contributes only the lock/epoch
/// wrapping (route calls through [`Bridge::with_session`]).
pub trait HostExec {
    /// Runs a piece of host code.
    fn run_host_code(&self, source: &MetaStr);
}
