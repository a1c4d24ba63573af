//! Marshalling of ordinary host variables across the boundary.
//!
//! Unlike the descriptors, which proxy live objects, these operations
//! convert by value: reading a host variable builds a fresh foreign
//! object from its current contents, and assigning a foreign object to a
//! host name stores a converted copy in the host table. The shape of the
//! foreign object picks the host kind, not the other way around.

use std::rc::Rc;

use foreign_runtime::{ObjRef, SharedHandle};
use host_params::PlainParam;
use host_types::{is_ident, HostValue, MetaStr};

use crate::encoding;
use crate::error::{BridgeError, BridgeResult};
use crate::state::Bridge;

/// Converts a host variable's current value into a foreign object.
///
/// Maps are captured through the host's own scanner under the bridge's
/// single capture-scan slot, so a reentrant capture (a scan visitor that
/// triggers another capture) is rejected instead of corrupting the scan.
/// Returns a handle owning the resulting reference.
pub fn param_to_foreign(bridge: &Rc<Bridge>, name: &str) -> BridgeResult<SharedHandle> {
    if !is_ident(name) {
        return Err(BridgeError::NameInvalid);
    }
    let ops = bridge
        .host()
        .table
        .borrow()
        .ops(name)
        .ok_or_else(|| BridgeError::NotFound(name.to_string()))?;
    let _session = bridge.enter();

    if let Some(map) = ops.as_map() {
        let rt = bridge.runtime();
        let dict = rt.new_dict();
        let guard = match bridge.begin_capture(dict) {
            Ok(guard) => guard,
            Err(err) => {
                rt.decref(dict);
                return Err(err);
            }
        };
        let mut failure = None;
        map.scan(&mut |key, entry| {
            if failure.is_some() {
                return;
            }
            let value = encoding::encode(rt, &entry.get());
            let result = rt.set_item(dict, &key.plain(), value);
            rt.decref(value);
            if let Err(err) = result {
                failure = Some(err);
            }
        });
        drop(guard);
        return match failure {
            Some(err) => {
                rt.decref(dict);
                Err(BridgeError::Foreign(err))
            }
            None => Ok(SharedHandle::adopt(rt, dict)),
        };
    }

    value_to_foreign(bridge, &ops.get())
}

/// Builds a foreign object from a host value.
pub fn value_to_foreign(bridge: &Rc<Bridge>, value: &HostValue) -> BridgeResult<SharedHandle> {
    let _session = bridge.enter();
    let rt = bridge.runtime();
    let obj = match value {
        HostValue::Scalar(s) => encoding::encode(rt, s),
        HostValue::Integer(n) => rt.new_int(*n),
        HostValue::Float(x) => rt.new_float(*x),
        HostValue::Array(items) => {
            let objs: Vec<ObjRef> = items.iter().map(|item| encoding::encode(rt, item)).collect();
            let list = rt.new_list(&objs);
            for item in objs {
                rt.decref(item);
            }
            list
        }
        HostValue::Map(pairs) => {
            let dict = rt.new_dict();
            for (key, value) in pairs {
                let obj_value = encoding::encode(rt, value);
                let result = rt.set_item(dict, &key.plain(), obj_value);
                rt.decref(obj_value);
                if let Err(err) = result {
                    rt.decref(dict);
                    return Err(BridgeError::Foreign(err));
                }
            }
            dict
        }
    };
    Ok(SharedHandle::adopt(rt, obj))
}

/// Stores a foreign object's converted value under a host variable name.
///
/// The unit object unsets the variable. Byte strings, exact integers and
/// exact floats store as the matching scalar kinds; mappings and
/// sequences convert element-wise and require byte-string contents. Any
/// other shape is rejected. An existing variable is written through its
/// own binding; a fresh name gets a plain host binding.
pub fn set_param_from_foreign(bridge: &Rc<Bridge>, name: &str, obj: ObjRef) -> BridgeResult<()> {
    if !is_ident(name) {
        return Err(BridgeError::NameInvalid);
    }
    let _session = bridge.enter();
    let rt = bridge.runtime();

    if rt.is_none(obj) {
        // Unsetting a variable that does not exist is a no-op
        let _ = bridge.host().table.borrow_mut().unset(name);
        return Ok(());
    }

    let value = if let Some(bytes) = rt.as_bytes(obj) {
        HostValue::Scalar(MetaStr::from_plain(&bytes))
    } else if let Some(n) = rt.as_int(obj) {
        HostValue::Integer(n)
    } else if let Some(x) = rt.as_float(obj) {
        HostValue::Float(x)
    } else if rt.is_mapping(obj) {
        let mut pairs = Vec::new();
        for key in rt.mapping_keys(obj)? {
            let item = rt.get_item(obj, &key)?;
            let bytes = rt.as_bytes(item);
            rt.decref(item);
            match bytes {
                Some(bytes) => pairs.push((
                    MetaStr::from_plain(&key),
                    MetaStr::from_plain(&bytes),
                )),
                None => {
                    return Err(BridgeError::Conversion(
                        "only byte-string values may be stored in a hash".into(),
                    ))
                }
            }
        }
        HostValue::Map(pairs)
    } else if rt.is_sequence(obj) {
        let items = rt.sequence_items(obj)?;
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
            return Err(BridgeError::Conversion(
                "sequence item is not a byte string".into(),
            ));
        }
        HostValue::Array(out)
    } else {
        return Err(BridgeError::Conversion(format!(
            "cannot store a {} in a host variable",
            rt.type_name(obj)
        )));
    };

    let mut table = bridge.host().table.borrow_mut();
    if table.contains(name) {
        table
            .set(name, value)
            .map_err(|err| BridgeError::Consistency(err.to_string()))?;
    } else {
        table
            .define(name, PlainParam::new(value))
            .map_err(|err| BridgeError::Consistency(err.to_string()))?;
    }
    Ok(())
}
