//! Plain (in-process) variable storage.

use std::cell::RefCell;
use std::rc::Rc;

use host_types::{HostValue, MetaStr};

use crate::ops::{EntryOps, MapOps, ParamKind, ParamOps};

/// An ordinary variable backed by in-process storage.
///
/// The kind follows the stored value; assignment replaces the value
/// wholesale and unset is handled by the table (there is nothing for the
/// binding itself to release).
pub struct PlainParam {
    value: Rc<RefCell<HostValue>>,
}

impl PlainParam {
    /// Creates a plain variable holding `value`.
    pub fn new(value: HostValue) -> Rc<Self> {
        Rc::new(PlainParam {
            value: Rc::new(RefCell::new(value)),
        })
    }
}

impl ParamOps for PlainParam {
    fn kind(&self) -> ParamKind {
        match *self.value.borrow() {
            HostValue::Scalar(_) => ParamKind::Scalar,
            HostValue::Integer(_) => ParamKind::Integer,
            HostValue::Float(_) => ParamKind::Float,
            HostValue::Array(_) => ParamKind::Array,
            HostValue::Map(_) => ParamKind::Map,
        }
    }

    fn get(&self) -> HostValue {
        self.value.borrow().clone()
    }

    fn set(&self, value: Option<HostValue>) {
        if let Some(value) = value {
            *self.value.borrow_mut() = value;
        }
    }

    fn as_map(&self) -> Option<&dyn MapOps> {
        match *self.value.borrow() {
            HostValue::Map(_) => Some(self),
            _ => None,
        }
    }
}

impl MapOps for PlainParam {
    fn entry(&self, key: &MetaStr) -> Box<dyn EntryOps> {
        Box::new(PlainEntry {
            value: Rc::clone(&self.value),
            key: key.clone(),
        })
    }

    fn scan(&self, visit: &mut dyn FnMut(&MetaStr, &dyn EntryOps)) {
        let keys: Vec<MetaStr> = match &*self.value.borrow() {
            HostValue::Map(pairs) => pairs.iter().map(|(k, _)| k.clone()).collect(),
            _ => Vec::new(),
        };
        for key in keys {
            let entry = PlainEntry {
                value: Rc::clone(&self.value),
                key: key.clone(),
            };
            visit(&key, &entry);
        }
    }

    fn remove(&self, key: &MetaStr) {
        if let HostValue::Map(pairs) = &mut *self.value.borrow_mut() {
            pairs.retain(|(k, _)| k != key);
        }
    }

    fn replace(&self, table: &[(MetaStr, MetaStr)]) {
        if let HostValue::Map(pairs) = &mut *self.value.borrow_mut() {
            *pairs = table.to_vec();
        }
    }
}

/// Transient view of one entry of a plain map.
struct PlainEntry {
    value: Rc<RefCell<HostValue>>,
    key: MetaStr,
}

impl EntryOps for PlainEntry {
    fn get(&self) -> MetaStr {
        match &*self.value.borrow() {
            HostValue::Map(pairs) => pairs
                .iter()
                .find(|(k, _)| *k == self.key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default(),
            _ => MetaStr::default(),
        }
    }

    fn set(&self, value: &MetaStr) {
        if let HostValue::Map(pairs) = &mut *self.value.borrow_mut() {
            match pairs.iter_mut().find(|(k, _)| *k == self.key) {
                Some(pair) => pair.1 = value.clone(),
                None => pairs.push((self.key.clone(), value.clone())),
            }
        }
    }
}
