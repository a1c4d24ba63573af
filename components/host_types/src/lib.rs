//! Host-side value types for the foreign variable bridge.
//!
//! This crate provides the foundational types the host variable machinery
//! trades in:
//!
//! - [`MetaStr`] - the host's internal byte-string representation, which
//!   escapes a reserved range of sentinel bytes
//! - [`HostValue`] - tagged representation of host variable values
//! - [`is_ident`] - identifier syntax check for variable names
//!
//! # Examples
//!
//! ```
//! use host_types::{HostValue, MetaStr};
//!
//! let s = MetaStr::from_plain(b"hello");
//! assert_eq!(s.plain(), b"hello");
//!
//! let value = HostValue::Scalar(s);
//! assert_eq!(value.type_name(), "scalar");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

mod ident;
mod metafied;
mod value;

pub use ident::is_ident;
pub use metafied::{needs_meta, MetaStr, META, MARKER};
pub use value::HostValue;
