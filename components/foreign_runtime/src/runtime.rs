//! The runtime: object heap, protocols, execution lock.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use parking_lot::{ReentrantMutex, ReentrantMutexGuard};

use crate::error::{ForeignError, ForeignResult};
use crate::object::{NativeObject, Numeric, ObjRef, ObjValue};

/// One heap cell: a reference count and the object it owns.
struct ObjCell {
    refs: usize,
    value: ObjValue,
}

/// Slab-allocated object heap with a free list.
///
/// Cells are reused after their last reference is released; an `ObjRef`
/// into a freed cell is a stale reference and every protocol call rejects
/// it.
#[derive(Default)]
struct Heap {
    cells: Vec<Option<ObjCell>>,
    free: Vec<usize>,
}

impl Heap {
    fn alloc(&mut self, value: ObjValue) -> ObjRef {
        let cell = ObjCell { refs: 1, value };
        match self.free.pop() {
            Some(index) => {
                self.cells[index] = Some(cell);
                ObjRef(index)
            }
            None => {
                self.cells.push(Some(cell));
                ObjRef(self.cells.len() - 1)
            }
        }
    }

    fn cell(&self, obj: ObjRef) -> ForeignResult<&ObjCell> {
        self.cells
            .get(obj.0)
            .and_then(|c| c.as_ref())
            .ok_or_else(|| ForeignError::Runtime("stale object reference".into()))
    }

    fn value(&self, obj: ObjRef) -> ForeignResult<&ObjValue> {
        Ok(&self.cell(obj)?.value)
    }

    fn value_mut(&mut self, obj: ObjRef) -> ForeignResult<&mut ObjValue> {
        match self.cells.get_mut(obj.0).and_then(|c| c.as_mut()) {
            Some(cell) => Ok(&mut cell.value),
            None => Err(ForeignError::Runtime("stale object reference".into())),
        }
    }

    fn retain(&mut self, obj: ObjRef) {
        if let Some(cell) = self.cells.get_mut(obj.0).and_then(|c| c.as_mut()) {
            cell.refs += 1;
        }
    }

    /// Releases one reference; frees the cell and releases the children
    /// it owned when the count reaches zero. Iterative so deep object
    /// graphs cannot overflow the stack.
    fn release(&mut self, obj: ObjRef) {
        let mut work = vec![obj];
        while let Some(current) = work.pop() {
            let last = match self.cells.get_mut(current.0).and_then(|c| c.as_mut()) {
                Some(cell) => {
                    if cell.refs > 1 {
                        cell.refs -= 1;
                        false
                    } else {
                        true
                    }
                }
                None => false,
            };
            if !last {
                continue;
            }
            if let Some(Some(cell)) = self.cells.get_mut(current.0).map(|c| c.take()) {
                self.free.push(current.0);
                match cell.value {
                    ObjValue::List(items) => work.extend(items),
                    ObjValue::Dict(pairs) => work.extend(pairs.into_iter().map(|(_, v)| v)),
                    _ => {}
                }
            }
        }
    }

    fn refcount(&self, obj: ObjRef) -> usize {
        self.cells
            .get(obj.0)
            .and_then(|c| c.as_ref())
            .map(|c| c.refs)
            .unwrap_or(0)
    }

    fn live(&self) -> usize {
        self.cells.iter().filter(|c| c.is_some()).count()
    }
}

/// The embedded interpreter runtime.
///
/// Single-threaded by contract: the execution lock serializes logical
/// ownership of the runtime's state, and all interior mutability is
/// `RefCell`/`Cell`-based. Constructors and the protocol methods that
/// return objects hand out +1 references the caller must release.
pub struct Runtime {
    heap: RefCell<Heap>,
    exec_lock: ReentrantMutex<()>,
    output: RefCell<Vec<u8>>,
    fork_resets: Cell<u64>,
}

impl Runtime {
    /// Creates a fresh runtime.
    pub fn new() -> Rc<Self> {
        Rc::new(Runtime {
            heap: RefCell::new(Heap::default()),
            exec_lock: ReentrantMutex::new(()),
            output: RefCell::new(Vec::new()),
            fork_resets: Cell::new(0),
        })
    }

    // ---- execution lock and fork state ----

    /// Acquires the runtime's single global execution lock. Reentrant:
    /// the one host thread may stack acquisitions freely.
    pub fn lock(&self) -> ReentrantMutexGuard<'_, ()> {
        self.exec_lock.lock()
    }

    /// One-time post-fork resynchronization. Re-arms runtime-internal
    /// lock bookkeeping that a low-level process duplication invalidates.
    pub fn after_fork(&self) {
        self.fork_resets.set(self.fork_resets.get() + 1);
    }

    /// Number of post-fork resets performed so far.
    pub fn fork_resets(&self) -> u64 {
        self.fork_resets.get()
    }

    // ---- buffered output ----

    /// Appends to the runtime's buffered output stream.
    pub fn write_output(&self, bytes: &[u8]) {
        self.output.borrow_mut().extend_from_slice(bytes);
    }

    /// Drains the buffered output. Called on every lock release so
    /// foreign-side output reaches the host promptly.
    pub fn take_output(&self) -> Vec<u8> {
        std::mem::take(&mut self.output.borrow_mut())
    }

    // ---- constructors (each returns a +1 reference) ----

    /// Allocates the unit object.
    pub fn new_none(&self) -> ObjRef {
        self.heap.borrow_mut().alloc(ObjValue::None)
    }

    /// Allocates a byte string.
    pub fn new_bytes(&self, bytes: &[u8]) -> ObjRef {
        self.heap.borrow_mut().alloc(ObjValue::Bytes(bytes.to_vec()))
    }

    /// Allocates an integer.
    pub fn new_int(&self, value: i64) -> ObjRef {
        self.heap.borrow_mut().alloc(ObjValue::Int(value))
    }

    /// Allocates a float.
    pub fn new_float(&self, value: f64) -> ObjRef {
        self.heap.borrow_mut().alloc(ObjValue::Float(value))
    }

    /// Allocates a list, retaining every item.
    pub fn new_list(&self, items: &[ObjRef]) -> ObjRef {
        let mut heap = self.heap.borrow_mut();
        for &item in items {
            heap.retain(item);
        }
        heap.alloc(ObjValue::List(items.to_vec()))
    }

    /// Allocates an empty mapping.
    pub fn new_dict(&self) -> ObjRef {
        self.heap.borrow_mut().alloc(ObjValue::Dict(Vec::new()))
    }

    /// Allocates an embedder-defined object.
    pub fn new_native(&self, native: impl NativeObject + 'static) -> ObjRef {
        self.heap
            .borrow_mut()
            .alloc(ObjValue::Native(Rc::new(RefCell::new(native))))
    }

    // ---- reference counting ----

    /// Adds a reference.
    pub fn incref(&self, obj: ObjRef) {
        self.heap.borrow_mut().retain(obj);
    }

    /// Releases a reference, freeing the object (and releasing its
    /// children) when it was the last one.
    pub fn decref(&self, obj: ObjRef) {
        self.heap.borrow_mut().release(obj);
    }

    /// Current reference count; zero for a freed object.
    pub fn refcount(&self, obj: ObjRef) -> usize {
        self.heap.borrow().refcount(obj)
    }

    /// Number of live heap cells.
    pub fn live_objects(&self) -> usize {
        self.heap.borrow().live()
    }

    // ---- protocol queries ----

    /// Type name for diagnostics.
    pub fn type_name(&self, obj: ObjRef) -> String {
        match self.heap.borrow().value(obj) {
            Ok(value) => value.type_name().to_string(),
            Err(_) => "stale reference".to_string(),
        }
    }

    /// Whether the object satisfies the numeric protocol.
    pub fn is_numeric(&self, obj: ObjRef) -> bool {
        match self.heap.borrow().value(obj) {
            Ok(ObjValue::Int(_)) | Ok(ObjValue::Float(_)) => true,
            Ok(ObjValue::Native(native)) => native.borrow().numeric().is_some(),
            _ => false,
        }
    }

    /// Whether the object satisfies the sequence protocol.
    pub fn is_sequence(&self, obj: ObjRef) -> bool {
        matches!(self.heap.borrow().value(obj), Ok(ObjValue::List(_)))
    }

    /// Whether the object satisfies the mapping protocol.
    pub fn is_mapping(&self, obj: ObjRef) -> bool {
        matches!(self.heap.borrow().value(obj), Ok(ObjValue::Dict(_)))
    }

    /// Whether the object satisfies the call protocol.
    pub fn is_callable(&self, obj: ObjRef) -> bool {
        match self.heap.borrow().value(obj) {
            Ok(ObjValue::Native(native)) => native.borrow().is_callable(),
            _ => false,
        }
    }

    /// Whether the object is a plain byte string.
    pub fn is_bytes(&self, obj: ObjRef) -> bool {
        matches!(self.heap.borrow().value(obj), Ok(ObjValue::Bytes(_)))
    }

    /// Whether the object is the unit object.
    pub fn is_none(&self, obj: ObjRef) -> bool {
        matches!(self.heap.borrow().value(obj), Ok(ObjValue::None))
    }

    // ---- text and numeric protocols ----

    /// The bytes of a byte-string object, or `None` for any other shape.
    pub fn as_bytes(&self, obj: ObjRef) -> Option<Vec<u8>> {
        match self.heap.borrow().value(obj) {
            Ok(ObjValue::Bytes(bytes)) => Some(bytes.clone()),
            _ => None,
        }
    }

    /// The value of an exact integer object; `None` for any other shape,
    /// including natives that merely coerce to an integer.
    pub fn as_int(&self, obj: ObjRef) -> Option<i64> {
        match self.heap.borrow().value(obj) {
            Ok(ObjValue::Int(n)) => Some(*n),
            _ => None,
        }
    }

    /// The value of an exact float object; `None` for any other shape.
    pub fn as_float(&self, obj: ObjRef) -> Option<f64> {
        match self.heap.borrow().value(obj) {
            Ok(ObjValue::Float(x)) => Some(*x),
            _ => None,
        }
    }

    /// Generic represent-as-text conversion.
    pub fn str_bytes(&self, obj: ObjRef) -> ForeignResult<Vec<u8>> {
        let native = {
            let heap = self.heap.borrow();
            match heap.value(obj)? {
                ObjValue::None => return Ok(Vec::new()),
                ObjValue::Bytes(bytes) => return Ok(bytes.clone()),
                ObjValue::Int(n) => return Ok(n.to_string().into_bytes()),
                ObjValue::Float(x) => return Ok(format_float(*x).into_bytes()),
                ObjValue::Native(native) => Rc::clone(native),
                other => {
                    return Err(ForeignError::Type(format!(
                        "{} is not representable as text",
                        other.type_name()
                    )))
                }
            }
        };
        // Bind the borrow so it is released before `native` drops
        let inner = native.borrow();
        inner.text()
    }

    /// Numeric-protocol coercion to an integer.
    pub fn to_int(&self, obj: ObjRef) -> ForeignResult<i64> {
        let native = {
            let heap = self.heap.borrow();
            match heap.value(obj)? {
                ObjValue::Int(n) => return Ok(*n),
                ObjValue::Float(x) => return Ok(*x as i64),
                ObjValue::Native(native) => Rc::clone(native),
                other => {
                    return Err(ForeignError::Type(format!(
                        "{} does not implement the numeric protocol",
                        other.type_name()
                    )))
                }
            }
        };
        let numeric = native.borrow().numeric();
        match numeric {
            Some(Numeric::Int(n)) => Ok(n),
            Some(Numeric::Float(x)) => Ok(x as i64),
            None => Err(ForeignError::Type(
                "object does not implement the numeric protocol".into(),
            )),
        }
    }

    /// Numeric-protocol coercion to a float.
    pub fn to_float(&self, obj: ObjRef) -> ForeignResult<f64> {
        let native = {
            let heap = self.heap.borrow();
            match heap.value(obj)? {
                ObjValue::Int(n) => return Ok(*n as f64),
                ObjValue::Float(x) => return Ok(*x),
                ObjValue::Native(native) => Rc::clone(native),
                other => {
                    return Err(ForeignError::Type(format!(
                        "{} does not implement the numeric protocol",
                        other.type_name()
                    )))
                }
            }
        };
        let numeric = native.borrow().numeric();
        match numeric {
            Some(Numeric::Int(n)) => Ok(n as f64),
            Some(Numeric::Float(x)) => Ok(x),
            None => Err(ForeignError::Type(
                "object does not implement the numeric protocol".into(),
            )),
        }
    }

    // ---- call protocol ----

    /// Invokes a callable object. Returns a +1 reference to the result.
    pub fn call(&self, obj: ObjRef, args: &[ObjRef]) -> ForeignResult<ObjRef> {
        let native = {
            let heap = self.heap.borrow();
            match heap.value(obj)? {
                ObjValue::Native(native) => Rc::clone(native),
                other => {
                    return Err(ForeignError::Type(format!(
                        "{} is not callable",
                        other.type_name()
                    )))
                }
            }
        };
        if !native.borrow().is_callable() {
            return Err(ForeignError::Type("object is not callable".into()));
        }
        // Bind the borrow so it is released before `native` drops
        let mut inner = native.borrow_mut();
        inner.call(self, args)
    }

    // ---- sequence protocol ----

    /// Items of a sequence, each as a +1 reference, in order.
    pub fn sequence_items(&self, obj: ObjRef) -> ForeignResult<Vec<ObjRef>> {
        let mut heap = self.heap.borrow_mut();
        let items = match heap.value(obj)? {
            ObjValue::List(items) => items.clone(),
            other => {
                return Err(ForeignError::Type(format!(
                    "{} does not implement the sequence protocol",
                    other.type_name()
                )))
            }
        };
        for &item in &items {
            heap.retain(item);
        }
        Ok(items)
    }

    // ---- mapping protocol ----

    /// Looks up a key. Returns a +1 reference, or `KeyError` when absent.
    pub fn get_item(&self, obj: ObjRef, key: &[u8]) -> ForeignResult<ObjRef> {
        let mut heap = self.heap.borrow_mut();
        let found = match heap.value(obj)? {
            ObjValue::Dict(pairs) => pairs.iter().find(|(k, _)| k == key).map(|&(_, v)| v),
            other => {
                return Err(ForeignError::Type(format!(
                    "{} does not implement the mapping protocol",
                    other.type_name()
                )))
            }
        };
        match found {
            Some(value) => {
                heap.retain(value);
                Ok(value)
            }
            None => Err(ForeignError::Key(String::from_utf8_lossy(key).into_owned())),
        }
    }

    /// Assigns a key. The mapping takes its own reference to the value;
    /// the caller keeps (and still owns) its reference.
    pub fn set_item(&self, obj: ObjRef, key: &[u8], value: ObjRef) -> ForeignResult<()> {
        let mut heap = self.heap.borrow_mut();
        heap.cell(value)?;
        let replaced = match heap.value_mut(obj)? {
            ObjValue::Dict(pairs) => match pairs.iter_mut().find(|(k, _)| k == key) {
                Some(pair) => Some(std::mem::replace(&mut pair.1, value)),
                None => {
                    pairs.push((key.to_vec(), value));
                    None
                }
            },
            other => {
                return Err(ForeignError::Type(format!(
                    "{} does not implement the mapping protocol",
                    other.type_name()
                )))
            }
        };
        heap.retain(value);
        if let Some(old) = replaced {
            heap.release(old);
        }
        Ok(())
    }

    /// Deletes a key; `KeyError` when absent.
    pub fn del_item(&self, obj: ObjRef, key: &[u8]) -> ForeignResult<()> {
        let mut heap = self.heap.borrow_mut();
        let removed = match heap.value_mut(obj)? {
            ObjValue::Dict(pairs) => {
                match pairs.iter().position(|(k, _)| k == key) {
                    Some(index) => Some(pairs.remove(index).1),
                    None => None,
                }
            }
            other => {
                return Err(ForeignError::Type(format!(
                    "{} does not implement the mapping protocol",
                    other.type_name()
                )))
            }
        };
        match removed {
            Some(value) => {
                heap.release(value);
                Ok(())
            }
            None => Err(ForeignError::Key(String::from_utf8_lossy(key).into_owned())),
        }
    }

    /// Keys yielded by the mapping's iteration protocol, in mapping order.
    pub fn iter_keys(&self, obj: ObjRef) -> ForeignResult<Vec<Vec<u8>>> {
        self.key_list(obj)
    }

    /// An explicit key-list snapshot, safe to walk while the mapping is
    /// being mutated.
    pub fn mapping_keys(&self, obj: ObjRef) -> ForeignResult<Vec<Vec<u8>>> {
        self.key_list(obj)
    }

    fn key_list(&self, obj: ObjRef) -> ForeignResult<Vec<Vec<u8>>> {
        let heap = self.heap.borrow();
        match heap.value(obj)? {
            ObjValue::Dict(pairs) => Ok(pairs.iter().map(|(k, _)| k.clone()).collect()),
            other => Err(ForeignError::Type(format!(
                "{} does not implement the mapping protocol",
                other.type_name()
            ))),
        }
    }

    /// Number of entries in a mapping.
    pub fn dict_len(&self, obj: ObjRef) -> ForeignResult<usize> {
        let heap = self.heap.borrow();
        match heap.value(obj)? {
            ObjValue::Dict(pairs) => Ok(pairs.len()),
            other => Err(ForeignError::Type(format!(
                "{} does not implement the mapping protocol",
                other.type_name()
            ))),
        }
    }
}

/// Float text form: always carries a fractional part so a float never
/// reads back as an integer.
fn format_float(x: f64) -> String {
    if x == x.trunc() && x.is_finite() && x.abs() < 1e15 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}
