//! Foreign object representation.

use std::cell::RefCell;
use std::rc::Rc;

use crate::error::{ForeignError, ForeignResult};
use crate::runtime::Runtime;

/// Handle to an object in the runtime's heap.
///
/// Plain index, no lifetime: validity is governed by reference counting,
/// and every holder is responsible for balancing the references it owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjRef(pub(crate) usize);

/// A numeric coercion result produced by a [`NativeObject`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Numeric {
    /// Integer coercion
    Int(i64),
    /// Floating-point coercion
    Float(f64),
}

/// An embedder-defined object with custom protocol behavior.
///
/// Default implementations decline every protocol; an embedder overrides
/// the ones its object supports. `call` receives the runtime so it can
/// inspect arguments and allocate its result.
pub trait NativeObject {
    /// Type name used in diagnostics.
    fn type_name(&self) -> &'static str {
        "native object"
    }

    /// Text representation (the generic represent-as-text protocol).
    fn text(&self) -> ForeignResult<Vec<u8>> {
        Err(ForeignError::Type(format!(
            "{} is not representable as text",
            self.type_name()
        )))
    }

    /// Numeric coercion, if the object supports the numeric protocol.
    fn numeric(&self) -> Option<Numeric> {
        None
    }

    /// Whether the object supports the call protocol.
    fn is_callable(&self) -> bool {
        false
    }

    /// Invoke the object. Returns a +1 reference the caller releases.
    fn call(&mut self, _rt: &Runtime, _args: &[ObjRef]) -> ForeignResult<ObjRef> {
        Err(ForeignError::Type(format!(
            "{} is not callable",
            self.type_name()
        )))
    }
}

/// The closed set of foreign object shapes.
pub enum ObjValue {
    /// The unit object returned by calls with nothing to say
    None,
    /// Byte string
    Bytes(Vec<u8>),
    /// Integer
    Int(i64),
    /// Floating-point number
    Float(f64),
    /// Ordered sequence of objects
    List(Vec<ObjRef>),
    /// Insertion-ordered mapping from byte-string keys to objects
    Dict(Vec<(Vec<u8>, ObjRef)>),
    /// Embedder-defined object
    Native(Rc<RefCell<dyn NativeObject>>),
}

impl ObjValue {
    /// Type name used in diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjValue::None => "none",
            ObjValue::Bytes(_) => "bytes",
            ObjValue::Int(_) => "int",
            ObjValue::Float(_) => "float",
            ObjValue::List(_) => "list",
            ObjValue::Dict(_) => "dict",
            ObjValue::Native(_) => "native object",
        }
    }
}

impl std::fmt::Debug for ObjValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjValue::None => write!(f, "None"),
            ObjValue::Bytes(b) => write!(f, "Bytes({:?})", String::from_utf8_lossy(b)),
            ObjValue::Int(n) => write!(f, "Int({})", n),
            ObjValue::Float(x) => write!(f, "Float({})", x),
            ObjValue::List(items) => write!(f, "List({} items)", items.len()),
            ObjValue::Dict(pairs) => write!(f, "Dict({} entries)", pairs.len()),
            ObjValue::Native(n) => write!(f, "Native({})", n.borrow().type_name()),
        }
    }
}
