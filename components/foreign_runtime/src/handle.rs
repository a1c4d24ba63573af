//! RAII ownership of a foreign object reference.

use std::rc::Rc;

use crate::object::ObjRef;
use crate::runtime::Runtime;

/// A shared, counted reference to a foreign object.
///
/// Construction takes a reference (or adopts one the caller already
/// holds), cloning takes another, and dropping releases it — the
/// cross-runtime lifetime contract is deterministic and never waits on a
/// collector on either side.
pub struct SharedHandle {
    rt: Rc<Runtime>,
    obj: ObjRef,
}

impl SharedHandle {
    /// Takes a new reference to `obj`.
    pub fn retain(rt: &Rc<Runtime>, obj: ObjRef) -> Self {
        rt.incref(obj);
        SharedHandle {
            rt: Rc::clone(rt),
            obj,
        }
    }

    /// Adopts a +1 reference the caller already owns (e.g. one returned
    /// by a constructor or by the call protocol) without taking another.
    pub fn adopt(rt: &Rc<Runtime>, obj: ObjRef) -> Self {
        SharedHandle {
            rt: Rc::clone(rt),
            obj,
        }
    }

    /// The referenced object.
    pub fn get(&self) -> ObjRef {
        self.obj
    }

    /// The runtime the object lives in.
    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.rt
    }
}

impl Clone for SharedHandle {
    fn clone(&self) -> Self {
        SharedHandle::retain(&self.rt, self.obj)
    }
}

impl Drop for SharedHandle {
    fn drop(&mut self) {
        self.rt.decref(self.obj);
    }
}

impl std::fmt::Debug for SharedHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "SharedHandle({:?}, {} refs)",
            self.obj,
            self.rt.refcount(self.obj)
        )
    }
}
