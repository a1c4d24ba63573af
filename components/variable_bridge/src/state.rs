//! Bridge state: the execution session discipline and the capture guard.
//!
//! Every boundary crossing, in either direction, runs inside an
//! [`ExecSession`]: acquire the runtime's execution lock, then compare
//! the host's fork generation against the epoch the bridge last
//! synchronized to. A stale epoch means the process forked since the
//! runtime was last entered, so the runtime is resynchronized exactly
//! once before any foreign state is touched.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use foreign_runtime::{ObjRef, Runtime};
use host_params::HostContext;
use parking_lot::ReentrantMutexGuard;

use crate::error::{BridgeError, BridgeResult};
use crate::registry::Registry;

/// Shared bridge state tying a host context to a foreign runtime.
pub struct Bridge {
    runtime: Rc<Runtime>,
    host: Rc<HostContext>,
    registry: RefCell<Registry>,
    epoch: Cell<u64>,
    scan_owner: RefCell<Option<ObjRef>>,
}

impl Bridge {
    /// Ties a runtime to a host context. The epoch starts synchronized
    /// to the host's current fork generation.
    pub fn new(runtime: Rc<Runtime>, host: Rc<HostContext>) -> Rc<Self> {
        let epoch = host.generation();
        Rc::new(Bridge {
            runtime,
            host,
            registry: RefCell::new(Registry::new()),
            epoch: Cell::new(epoch),
            scan_owner: RefCell::new(None),
        })
    }

    /// The foreign runtime.
    pub fn runtime(&self) -> &Rc<Runtime> {
        &self.runtime
    }

    /// The host context.
    pub fn host(&self) -> &Rc<HostContext> {
        &self.host
    }

    /// The descriptor registry.
    pub fn registry(&self) -> &RefCell<Registry> {
        &self.registry
    }

    /// Number of live foreign-backed variable descriptors.
    pub fn descriptor_count(&self) -> usize {
        self.registry.borrow().len()
    }

    /// Enters the runtime: takes the execution lock and performs the
    /// post-fork resynchronization if the host forked since the last
    /// entry. Reentrant, so nested crossings stack freely.
    pub fn enter(&self) -> ExecSession<'_> {
        let guard = self.runtime.lock();
        let generation = self.host.generation();
        if generation > self.epoch.get() {
            self.epoch.set(generation);
            // The parent process still owns whatever the scan slot held;
            // the child only forgets it ever saw a scan in flight.
            self.scan_owner.borrow_mut().take();
            self.runtime.after_fork();
        }
        ExecSession {
            bridge: self,
            _guard: guard,
        }
    }

    /// Runs embedder code inside a session. This is the hook host-side
    /// command implementations use so arbitrary foreign execution gets
    /// the same lock/epoch treatment as variable access.
    pub fn with_session<R>(&self, f: impl FnOnce(&Rc<Runtime>) -> R) -> R {
        let _session = self.enter();
        f(&self.runtime)
    }

    /// Claims the single capture-scan slot for `dict`. Fails when a
    /// capture is already in flight.
    pub fn begin_capture(&self, dict: ObjRef) -> BridgeResult<CaptureGuard<'_>> {
        let mut slot = self.scan_owner.borrow_mut();
        if slot.is_some() {
            return Err(BridgeError::ScanConflict);
        }
        *slot = Some(dict);
        Ok(CaptureGuard { bridge: self, dict })
    }

    /// Whether a capture scan is in flight.
    pub fn capture_in_flight(&self) -> bool {
        self.scan_owner.borrow().is_some()
    }
}

/// A held execution session. Dropping it releases the lock after
/// flushing any output the foreign side buffered while it ran.
pub struct ExecSession<'a> {
    bridge: &'a Bridge,
    _guard: ReentrantMutexGuard<'a, ()>,
}

impl Drop for ExecSession<'_> {
    fn drop(&mut self) {
        let pending = self.bridge.runtime.take_output();
        if !pending.is_empty() {
            self.bridge.host.emit_output(&pending);
        }
    }
}

/// Ownership of the capture-scan slot. Dropping it frees the slot,
/// unless a post-fork resynchronization already cleared it.
pub struct CaptureGuard<'a> {
    bridge: &'a Bridge,
    dict: ObjRef,
}

impl Drop for CaptureGuard<'_> {
    fn drop(&mut self) {
        let mut slot = self.bridge.scan_owner.borrow_mut();
        if *slot == Some(self.dict) {
            *slot = None;
        }
    }
}
