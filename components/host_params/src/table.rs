//! The parameter table.
//!
//! Names bind to [`Binding`]s; redefining a name pushes the previous
//! binding onto a last-wins shadow chain, and unsetting the active
//! binding promotes the most recent shadowed one. Teardown of
//! foreign-backed variables needs to remove one *specific* binding from
//! wherever it sits in its chain, which is what [`ParamTable::unset_exact`]
//! provides.

use std::collections::HashMap;
use std::rc::Rc;

use host_types::HostValue;
use thiserror::Error;

use crate::ops::ParamOps;

/// Errors surfaced by the table itself.
#[derive(Debug, Error)]
pub enum TableError {
    /// The name already denotes a binding
    #[error("parameter `{0}` already exists")]
    Exists(String),
    /// No binding for the name, or none matching the requested identity
    #[error("no such parameter `{0}`")]
    NotFound(String),
}

/// One name binding: the dispatch ops plus the chain of bindings this
/// one shadows.
pub struct Binding {
    /// The bound name.
    pub name: String,
    /// Dispatch implementation, fixed for the binding's lifetime.
    pub ops: Rc<dyn ParamOps>,
    old: Option<Box<Binding>>,
}

/// The process-wide name → binding table.
#[derive(Default)]
pub struct ParamTable {
    bindings: HashMap<String, Binding>,
}

impl ParamTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        ParamTable::default()
    }

    /// Whether any binding (active or shadowed) exists for the name.
    pub fn contains(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    /// Binds a fresh name. Fails when the name denotes any existing
    /// binding.
    pub fn define(&mut self, name: &str, ops: Rc<dyn ParamOps>) -> Result<(), TableError> {
        if self.contains(name) {
            return Err(TableError::Exists(name.to_string()));
        }
        self.bindings.insert(
            name.to_string(),
            Binding {
                name: name.to_string(),
                ops,
                old: None,
            },
        );
        Ok(())
    }

    /// Redefines a name: the current active binding (if any) is shadowed.
    pub fn shadow(&mut self, name: &str, ops: Rc<dyn ParamOps>) {
        let old = self.bindings.remove(name).map(Box::new);
        self.bindings.insert(
            name.to_string(),
            Binding {
                name: name.to_string(),
                ops,
                old,
            },
        );
    }

    /// The active binding for a name.
    pub fn active(&self, name: &str) -> Option<&Binding> {
        self.bindings.get(name)
    }

    /// The active binding's ops, cloned out for dispatch.
    pub fn ops(&self, name: &str) -> Option<Rc<dyn ParamOps>> {
        self.bindings.get(name).map(|b| Rc::clone(&b.ops))
    }

    /// Reads the active binding's value.
    pub fn get(&self, name: &str) -> Option<HostValue> {
        self.bindings.get(name).map(|b| b.ops.get())
    }

    /// Writes the active binding's value.
    pub fn set(&self, name: &str, value: HostValue) -> Result<(), TableError> {
        match self.bindings.get(name) {
            Some(binding) => {
                binding.ops.set(Some(value));
                Ok(())
            }
            None => Err(TableError::NotFound(name.to_string())),
        }
    }

    /// The standard unset path: release whatever the active binding owns,
    /// drop it, and promote the most recent shadowed binding.
    pub fn unset(&mut self, name: &str) -> Result<(), TableError> {
        let mut binding = self
            .bindings
            .remove(name)
            .ok_or_else(|| TableError::NotFound(name.to_string()))?;
        binding.ops.set(None);
        if let Some(old) = binding.old.take() {
            self.bindings.insert(name.to_string(), *old);
        }
        Ok(())
    }

    /// Unsets one specific binding, wherever it sits in the name's shadow
    /// chain: splices it out (preserving the order of any other shadowing
    /// entries, promoting the shadowed binding when it was active) and
    /// runs the standard release on it.
    ///
    /// The binding identity is the ops pointer; a name whose chain does
    /// not contain it is a consistency failure surfaced as `NotFound`.
    pub fn unset_exact(
        &mut self,
        name: &str,
        target: &Rc<dyn ParamOps>,
    ) -> Result<(), TableError> {
        let mut binding = self
            .bindings
            .remove(name)
            .ok_or_else(|| TableError::NotFound(name.to_string()))?;

        if Rc::ptr_eq(&binding.ops, target) {
            binding.ops.set(None);
            if let Some(old) = binding.old.take() {
                self.bindings.insert(name.to_string(), *old);
            }
            return Ok(());
        }

        let spliced = splice_chain(&mut binding.old, target);
        self.bindings.insert(name.to_string(), binding);
        match spliced {
            Some(found) => {
                found.ops.set(None);
                Ok(())
            }
            None => Err(TableError::NotFound(name.to_string())),
        }
    }

    /// Number of active bindings.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Whether the table has no bindings at all.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

/// Removes the chain node whose ops match `target`, relinking the chain
/// around it.
fn splice_chain(
    chain: &mut Option<Box<Binding>>,
    target: &Rc<dyn ParamOps>,
) -> Option<Box<Binding>> {
    let mut cur = chain;
    loop {
        let found = matches!(cur, Some(b) if Rc::ptr_eq(&b.ops, target));
        if found {
            let mut node = cur.take()?;
            *cur = node.old.take();
            return Some(node);
        }
        cur = match cur {
            Some(b) => &mut b.old,
            None => return None,
        };
    }
}
