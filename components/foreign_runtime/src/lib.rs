//! Embedded interpreter runtime.
//!
//! This component models the foreign side of the variable bridge: a
//! reference-counted object heap with the object protocols the bridge
//! depends on (text conversion, numeric coercion, sequence iteration,
//! mapping access, calls), the runtime's single global execution lock,
//! buffered foreign-side output, and post-fork state recovery.
//!
//! The runtime is deliberately small: it is the embedded half of the
//! bridge, not a language. Embedders extend it with [`NativeObject`]
//! implementations — objects with custom call/text/numeric behavior —
//! while plain data lives in the closed [`ObjValue`] variants.
//!
//! Reference counting is manual and deterministic, mirroring the foreign
//! runtime's own discipline: constructors return a +1 reference and every
//! holder balances it with [`Runtime::decref`] or owns it through a
//! [`SharedHandle`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod error;
pub mod handle;
pub mod object;
pub mod runtime;

pub use error::{ForeignError, ForeignResult};
pub use handle::SharedHandle;
pub use object::{NativeObject, Numeric, ObjRef, ObjValue};
pub use runtime::Runtime;
