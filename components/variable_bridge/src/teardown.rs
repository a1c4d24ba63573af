//! Shutdown teardown of every foreign-backed variable.

use std::rc::Rc;

use crate::state::Bridge;

impl Bridge {
    /// Unbinds every registered foreign-backed variable, in declaration
    /// order, and releases the foreign references they held.
    ///
    /// Each descriptor is removed from wherever it sits in its name's
    /// shadow chain, so variables the user has since shadowed or that
    /// shadow something else come out cleanly. A descriptor whose
    /// binding has vanished from the host table is a consistency
    /// failure: it is reported, and the foreign reference is released
    /// anyway so shutdown never leaks.
    pub fn teardown(self: &Rc<Self>) {
        let _session = self.enter();
        let ids = self.registry().borrow().ids();
        for id in ids {
            let entry = match self.registry().borrow().entry(id) {
                Some(entry) => Some((entry.name.clone(), Rc::clone(&entry.ops))),
                None => None,
            };
            let (name, ops) = match entry {
                Some(entry) => entry,
                // Already unlinked by an earlier unset in this loop
                None => continue,
            };
            let result = self.host().table.borrow_mut().unset_exact(&name, &ops);
            if let Err(err) = result {
                self.host().report(format!(
                    "consistency error while tearing down parameter {}: {}",
                    name, err
                ));
                // The host-side binding is gone or foreign to us; still
                // detach the descriptor and release its object
                ops.set(None);
                self.registry().borrow_mut().remove(id);
            }
        }
    }
}
