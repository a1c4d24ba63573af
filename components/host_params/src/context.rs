//! Process-wide host state the bridge consumes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use crate::table::ParamTable;

/// The host environment as the bridge sees it: the parameter table, the
/// monotonic subshell generation counter the epoch guard compares
/// against, the diagnostics channel, and the sink foreign-side output is
/// flushed into.
pub struct HostContext {
    /// The parameter table.
    pub table: RefCell<ParamTable>,
    subshell: Cell<u64>,
    diagnostics: RefCell<Vec<String>>,
    output: RefCell<Vec<u8>>,
}

impl HostContext {
    /// Creates a fresh host context.
    pub fn new() -> Rc<Self> {
        Rc::new(HostContext {
            table: RefCell::new(ParamTable::new()),
            subshell: Cell::new(0),
            diagnostics: RefCell::new(Vec::new()),
            output: RefCell::new(Vec::new()),
        })
    }

    /// Current subshell/fork generation.
    pub fn generation(&self) -> u64 {
        self.subshell.get()
    }

    /// Records that the process forked into a new subshell generation.
    /// The host's fork machinery calls this; the bridge only observes it.
    pub fn fork(&self) {
        self.subshell.set(self.subshell.get() + 1);
    }

    /// Writes a formatted diagnostic to the host error channel.
    pub fn report(&self, message: impl Into<String>) {
        self.diagnostics.borrow_mut().push(message.into());
    }

    /// Drains recorded diagnostics.
    pub fn drain_diagnostics(&self) -> Vec<String> {
        std::mem::take(&mut self.diagnostics.borrow_mut())
    }

    /// Appends flushed foreign-side output.
    pub fn emit_output(&self, bytes: &[u8]) {
        self.output.borrow_mut().extend_from_slice(bytes);
    }

    /// Drains accumulated foreign-side output.
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut self.output.borrow_mut())
    }
}
