//! Variable dispatch traits.
//!
//! The host variable machinery reads and writes every variable through
//! these traits, exactly as it would a native one. Implementations are
//! selected when the variable is bound and never change afterwards.

use host_types::{HostValue, MetaStr};

/// The host-visible kind of a variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// String scalar
    Scalar,
    /// Integer number
    Integer,
    /// Floating-point number
    Float,
    /// Ordered array
    Array,
    /// Associative map
    Map,
}

/// Get/set/unset behavior of one variable binding.
///
/// Errors never propagate through this surface: a failing get yields the
/// kind's empty value and a failing set is reported through the host
/// diagnostics channel by the implementation, matching how the host
/// surfaces errors for native variables.
pub trait ParamOps {
    /// The binding's kind.
    fn kind(&self) -> ParamKind;

    /// Current value.
    fn get(&self) -> HostValue;

    /// Assign a value; `None` means the variable is being unset and the
    /// implementation must release whatever the binding owns.
    fn set(&self, value: Option<HostValue>);

    /// Map-specific access, for map-kind bindings only.
    fn as_map(&self) -> Option<&dyn MapOps> {
        None
    }
}

/// Per-entry access to a map-kind variable.
pub trait MapOps {
    /// An ephemeral view of one entry, created per access and discarded
    /// after it.
    fn entry(&self, key: &MetaStr) -> Box<dyn EntryOps>;

    /// Full-table iteration. `visit` receives each key and a transient
    /// per-key view whose value is fetched only if the visitor asks.
    fn scan(&self, visit: &mut dyn FnMut(&MetaStr, &dyn EntryOps));

    /// Remove a single entry.
    fn remove(&self, key: &MetaStr);

    /// Replace the whole table with the given entries.
    fn replace(&self, table: &[(MetaStr, MetaStr)]);
}

/// One map entry, by the same shape as any scalar variable.
pub trait EntryOps {
    /// The entry's value; unset entries read as the empty string.
    fn get(&self) -> MetaStr;

    /// Assign the entry's value.
    fn set(&self, value: &MetaStr);
}
