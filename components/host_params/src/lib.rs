//! Host parameter machinery.
//!
//! This component is the host-side collaborator of the variable bridge:
//!
//! - [`ParamTable`] - the name → binding table, with last-wins shadow
//!   chains for name redefinition and the chain-splice operation teardown
//!   depends on
//! - [`ParamOps`] / [`MapOps`] / [`EntryOps`] - the traits the host's
//!   variable-access machinery dispatches through, for foreign-backed and
//!   plain variables alike
//! - [`PlainParam`] - ordinary in-process variable storage
//! - [`HostContext`] - the process-wide host state the bridge consumes:
//!   diagnostics channel, subshell generation counter, flushed output
//!
//! The host is single-threaded; all interior mutability is `RefCell` and
//! `Cell` based and nothing here takes a lock.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod context;
pub mod ops;
pub mod plain;
pub mod table;

pub use context::HostContext;
pub use ops::{EntryOps, MapOps, ParamKind, ParamOps};
pub use plain::PlainParam;
pub use table::{Binding, ParamTable, TableError};
