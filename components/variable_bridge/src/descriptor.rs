//! Foreign-backed variable descriptors.
//!
//! A descriptor binds a host variable name to a retained foreign object
//! and dispatches the host's get/set/unset protocol onto the object's
//! protocols. Reads convert through the text, numeric or sequence
//! protocol as the declared kind dictates; writes invoke the object's
//! call protocol (or, for maps, mutate the mapping in place). Failures
//! on this surface never propagate: reads degrade to the kind's empty
//! value and writes report through the host diagnostics channel, the
//! same way the host surfaces errors for its native variables.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use foreign_runtime::{ObjRef, SharedHandle};
use host_params::{MapOps, ParamKind, ParamOps};
use host_types::{is_ident, HostValue, MetaStr};

use crate::encoding;
use crate::error::{BridgeError, BridgeResult};
use crate::registry::{NodeId, RegistryEntry};
use crate::state::Bridge;
use crate::SPECIAL_PREFIX;

/// Declared kind of a foreign-backed variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariableKind {
    /// String scalar backed by the text protocol
    String,
    /// Integer backed by the numeric protocol
    Integer,
    /// Float backed by the numeric protocol
    Float,
    /// Array backed by the sequence protocol
    Array,
    /// Associative map backed by the mapping protocol
    Map,
}

impl VariableKind {
    /// The host-visible kind this maps onto.
    pub fn param_kind(self) -> ParamKind {
        match self {
            VariableKind::String => ParamKind::Scalar,
            VariableKind::Integer => ParamKind::Integer,
            VariableKind::Float => ParamKind::Float,
            VariableKind::Array => ParamKind::Array,
            VariableKind::Map => ParamKind::Map,
        }
    }

    /// Diagnostic label.
    pub(crate) fn label(self) -> &'static str {
        match self {
            VariableKind::String => "string",
            VariableKind::Integer => "integer",
            VariableKind::Float => "float",
            VariableKind::Array => "array",
            VariableKind::Map => "hash",
        }
    }
}

/// Validates a candidate foreign-backed variable name: the reserved
/// prefix (case-insensitive), at least one more character, and legal
/// identifier syntax throughout.
fn check_special_name(name: &str) -> BridgeResult<()> {
    let prefixed = name
        .get(..SPECIAL_PREFIX.len())
        .map(|p| p.eq_ignore_ascii_case(SPECIAL_PREFIX))
        .unwrap_or(false);
    if !prefixed || name.len() == SPECIAL_PREFIX.len() || !is_ident(name) {
        return Err(BridgeError::NameInvalid);
    }
    Ok(())
}

/// One foreign-backed variable: the bound name, the declared kind, the
/// retained backing object and the descriptor's registry node.
pub struct ForeignParam {
    name: String,
    kind: VariableKind,
    backing: RefCell<Option<SharedHandle>>,
    node: Cell<Option<NodeId>>,
    bridge: Weak<Bridge>,
}

impl Bridge {
    /// Declares a foreign-backed variable of the given kind over `obj`.
    ///
    /// Takes its own reference to `obj`; the caller keeps whatever
    /// references it already owns. The name must carry the reserved
    /// prefix, must not collide with any existing variable, and the
    /// object must satisfy the protocol the kind requires. On failure
    /// nothing is registered and no reference is kept.
    pub fn declare(self: &Rc<Self>, name: &str, kind: VariableKind, obj: ObjRef) -> BridgeResult<()> {
        check_special_name(name)?;
        if self.host().table.borrow().contains(name) {
            return Err(BridgeError::NameExists(name.to_string()));
        }
        let _session = self.enter();
        let rt = self.runtime();
        match kind {
            VariableKind::String => {}
            VariableKind::Integer | VariableKind::Float => {
                if !rt.is_numeric(obj) {
                    return Err(BridgeError::WrongProtocol("numeric"));
                }
            }
            VariableKind::Array => {
                if !rt.is_sequence(obj) {
                    return Err(BridgeError::WrongProtocol("sequence"));
                }
            }
            VariableKind::Map => {
                if !rt.is_mapping(obj) {
                    return Err(BridgeError::WrongProtocol("mapping"));
                }
            }
        }

        let param = Rc::new(ForeignParam {
            name: name.to_string(),
            kind,
            backing: RefCell::new(Some(SharedHandle::retain(rt, obj))),
            node: Cell::new(None),
            bridge: Rc::downgrade(self),
        });
        let ops = Rc::clone(&param) as Rc<dyn ParamOps>;
        let id = self.registry().borrow_mut().push_back(RegistryEntry {
            name: name.to_string(),
            ops: Rc::clone(&ops),
        });
        param.node.set(Some(id));

        if self.host().table.borrow_mut().define(name, ops).is_err() {
            self.registry().borrow_mut().remove(id);
            param.node.set(None);
            param.backing.borrow_mut().take();
            return Err(BridgeError::NameExists(name.to_string()));
        }
        Ok(())
    }
}

impl ForeignParam {
    /// The bound name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The declared kind.
    pub fn variable_kind(&self) -> VariableKind {
        self.kind
    }

    /// Runs `f` against the live bridge and backing object; yields
    /// `default` when the bridge is gone or the backing was released.
    pub(crate) fn with_object<R>(&self, default: R, f: impl FnOnce(&Rc<Bridge>, ObjRef) -> R) -> R {
        let bridge = match self.bridge.upgrade() {
            Some(bridge) => bridge,
            None => return default,
        };
        let obj = match self.backing.borrow().as_ref().map(|h| h.get()) {
            Some(obj) => obj,
            None => return default,
        };
        f(&bridge, obj)
    }

    /// Weak bridge reference for per-entry views that may outlive the
    /// descriptor.
    pub(crate) fn bridge_weak(&self) -> Weak<Bridge> {
        self.bridge.clone()
    }

    /// A fresh reference to the backing object, if still attached.
    pub(crate) fn backing(&self) -> Option<SharedHandle> {
        self.backing.borrow().clone()
    }

    pub(crate) fn report_read_failure(&self, bridge: &Bridge, err: impl std::fmt::Display) {
        bridge.host().report(format!(
            "failed to transform value for parameter {}: {}",
            self.name, err
        ));
    }

    pub(crate) fn report_write_failure(&self, bridge: &Bridge, err: impl std::fmt::Display) {
        bridge.host().report(format!(
            "failed to assign value for {} parameter {}: {}",
            self.kind.label(),
            self.name,
            err
        ));
    }

    fn get_string(&self) -> MetaStr {
        self.with_object(MetaStr::default(), |bridge, obj| {
            let _session = bridge.enter();
            match encoding::decode(bridge.runtime(), obj) {
                Ok(value) => value,
                Err(err) => {
                    self.report_read_failure(bridge, err);
                    MetaStr::default()
                }
            }
        })
    }

    fn get_integer(&self) -> i64 {
        self.with_object(0, |bridge, obj| {
            let _session = bridge.enter();
            match bridge.runtime().to_int(obj) {
                Ok(n) => n,
                Err(err) => {
                    self.report_read_failure(bridge, err);
                    0
                }
            }
        })
    }

    fn get_float(&self) -> f64 {
        self.with_object(0.0, |bridge, obj| {
            let _session = bridge.enter();
            match bridge.runtime().to_float(obj) {
                Ok(x) => x,
                Err(err) => {
                    self.report_read_failure(bridge, err);
                    0.0
                }
            }
        })
    }

    fn get_array(&self) -> Vec<MetaStr> {
        self.with_object(Vec::new(), |bridge, obj| {
            let _session = bridge.enter();
            let rt = bridge.runtime();
            let items = match rt.sequence_items(obj) {
                Ok(items) => items,
                Err(err) => {
                    self.report_read_failure(bridge, err);
                    return Vec::new();
                }
            };
            let mut out = Vec::with_capacity(items.len());
            let mut bad_item = false;
            for &item in &items {
                match rt.as_bytes(item) {
                    Some(bytes) => out.push(MetaStr::from_plain(&bytes)),
                    None => bad_item = true,
                }
            }
            for item in items {
                rt.decref(item);
            }
            if bad_item {
                self.report_read_failure(bridge, "sequence item is not a byte string");
                return Vec::new();
            }
            out
        })
    }

    fn get_map_snapshot(&self) -> Vec<(MetaStr, MetaStr)> {
        let mut pairs = Vec::new();
        if let Some(map) = self.as_map() {
            map.scan(&mut |key, entry| pairs.push((key.clone(), entry.get())));
        }
        pairs
    }

    /// Invokes the backing object with `args`, discarding the result.
    /// A non-callable backing makes the variable read-only by convention
    /// and the write is silently dropped.
    fn call_setter(&self, bridge: &Bridge, obj: ObjRef, args: &[ObjRef]) {
        let rt = bridge.runtime();
        if !rt.is_callable(obj) {
            return;
        }
        match rt.call(obj, args) {
            Ok(result) => rt.decref(result),
            Err(err) => self.report_write_failure(bridge, err),
        }
    }

    fn assign(&self, value: HostValue) {
        match self.kind {
            VariableKind::String => self.with_object((), |bridge, obj| {
                let _session = bridge.enter();
                let rt = bridge.runtime();
                let arg = encoding::encode(rt, &value.as_scalar());
                self.call_setter(bridge, obj, &[arg]);
                rt.decref(arg);
            }),
            VariableKind::Integer => self.with_object((), |bridge, obj| {
                let _session = bridge.enter();
                let n = match value {
                    HostValue::Integer(n) => n,
                    HostValue::Float(x) => x as i64,
                    ref other => {
                        self.report_write_failure(
                            bridge,
                            format!("cannot assign a {} value", other.type_name()),
                        );
                        return;
                    }
                };
                let rt = bridge.runtime();
                let arg = rt.new_int(n);
                self.call_setter(bridge, obj, &[arg]);
                rt.decref(arg);
            }),
            VariableKind::Float => self.with_object((), |bridge, obj| {
                let _session = bridge.enter();
                let x = match value {
                    HostValue::Float(x) => x,
                    HostValue::Integer(n) => n as f64,
                    ref other => {
                        self.report_write_failure(
                            bridge,
                            format!("cannot assign a {} value", other.type_name()),
                        );
                        return;
                    }
                };
                let rt = bridge.runtime();
                let arg = rt.new_float(x);
                self.call_setter(bridge, obj, &[arg]);
                rt.decref(arg);
            }),
            VariableKind::Array => self.with_object((), |bridge, obj| {
                let _session = bridge.enter();
                let items = match value {
                    HostValue::Array(ref items) => items,
                    ref other => {
                        self.report_write_failure(
                            bridge,
                            format!("cannot assign a {} value", other.type_name()),
                        );
                        return;
                    }
                };
                let rt = bridge.runtime();
                let objs: Vec<ObjRef> = items.iter().map(|item| encoding::encode(rt, item)).collect();
                let list = rt.new_list(&objs);
                for item in &objs {
                    rt.decref(*item);
                }
                self.call_setter(bridge, obj, &[list]);
                rt.decref(list);
            }),
            VariableKind::Map => match value {
                HostValue::Map(ref pairs) => {
                    if let Some(map) = self.as_map() {
                        map.replace(pairs);
                    }
                }
                ref other => self.with_object((), |bridge, _| {
                    self.report_write_failure(
                        bridge,
                        format!("cannot assign a {} value", other.type_name()),
                    );
                }),
            },
        }
    }

    /// The unset path: detach the registry node and release the backing
    /// reference. The backing slot is cleared first so any reentrant
    /// access during release observes an already-detached descriptor.
    fn release(&self) {
        let node = self.node.take();
        let handle = self.backing.borrow_mut().take();
        if let Some(bridge) = self.bridge.upgrade() {
            let _session = bridge.enter();
            if let Some(id) = node {
                bridge.registry().borrow_mut().remove(id);
            }
            drop(handle);
        }
        // With the bridge gone the handle still releases through its own
        // runtime reference when dropped here.
    }
}

impl ParamOps for ForeignParam {
    fn kind(&self) -> ParamKind {
        self.kind.param_kind()
    }

    fn get(&self) -> HostValue {
        match self.kind {
            VariableKind::String => HostValue::Scalar(self.get_string()),
            VariableKind::Integer => HostValue::Integer(self.get_integer()),
            VariableKind::Float => HostValue::Float(self.get_float()),
            VariableKind::Array => HostValue::Array(self.get_array()),
            VariableKind::Map => HostValue::Map(self.get_map_snapshot()),
        }
    }

    fn set(&self, value: Option<HostValue>) {
        match value {
            Some(value) => self.assign(value),
            None => self.release(),
        }
    }

    fn as_map(&self) -> Option<&dyn MapOps> {
        if self.kind == VariableKind::Map {
            Some(self)
        } else {
            None
        }
    }
}
