//! The lazy map view over a foreign mapping.
//!
//! A map-kind variable never materializes a host-side copy of the
//! mapping. Point lookups create an ephemeral per-entry view that
//! fetches the value through the mapping protocol on demand, writes go
//! straight through item assignment, and a full-table scan walks the
//! mapping's own key iterator, fetching each value only if the visitor
//! asks for it. Mutations on either side are therefore immediately
//! visible on the other.

use std::rc::Weak;

use foreign_runtime::SharedHandle;
use host_params::{EntryOps, MapOps};
use host_types::MetaStr;

use crate::descriptor::ForeignParam;
use crate::encoding;
use crate::state::Bridge;

/// An ephemeral view of one mapping entry. Holds its own reference to
/// the mapping so it stays usable even if the variable is unset while
/// the view is alive.
struct ForeignEntry {
    bridge: Weak<Bridge>,
    name: String,
    map: Option<SharedHandle>,
    key: MetaStr,
}

impl ForeignEntry {
    fn report(&self, bridge: &Bridge, action: &str, err: impl std::fmt::Display) {
        bridge.host().report(format!(
            "failed to {} hash parameter {} entry {}: {}",
            action,
            self.name,
            self.key.display(),
            err
        ));
    }
}

impl EntryOps for ForeignEntry {
    fn get(&self) -> MetaStr {
        let (bridge, map) = match (self.bridge.upgrade(), self.map.as_ref()) {
            (Some(bridge), Some(map)) => (bridge, map.get()),
            _ => return MetaStr::default(),
        };
        let _session = bridge.enter();
        let rt = bridge.runtime();
        match rt.get_item(map, &self.key.plain()) {
            Ok(value) => {
                let decoded = encoding::decode(rt, value);
                rt.decref(value);
                match decoded {
                    Ok(text) => text,
                    Err(err) => {
                        self.report(&bridge, "read", err);
                        MetaStr::default()
                    }
                }
            }
            // A missing key reads as the empty string, like any unset
            // host variable
            Err(err) if err.is_key_error() => MetaStr::default(),
            Err(err) => {
                self.report(&bridge, "read", err);
                MetaStr::default()
            }
        }
    }

    fn set(&self, value: &MetaStr) {
        let (bridge, map) = match (self.bridge.upgrade(), self.map.as_ref()) {
            (Some(bridge), Some(map)) => (bridge, map.get()),
            _ => return,
        };
        let _session = bridge.enter();
        let rt = bridge.runtime();
        let obj = encoding::encode(rt, value);
        if let Err(err) = rt.set_item(map, &self.key.plain(), obj) {
            self.report(&bridge, "write", err);
        }
        rt.decref(obj);
    }
}

impl MapOps for ForeignParam {
    fn entry(&self, key: &MetaStr) -> Box<dyn EntryOps> {
        Box::new(ForeignEntry {
            bridge: self.bridge_weak(),
            name: self.name().to_string(),
            map: self.backing(),
            key: key.clone(),
        })
    }

    fn scan(&self, visit: &mut dyn FnMut(&MetaStr, &dyn EntryOps)) {
        self.with_object((), |bridge, obj| {
            let _session = bridge.enter();
            let keys = match bridge.runtime().iter_keys(obj) {
                Ok(keys) => keys,
                Err(err) => {
                    self.report_read_failure(bridge, err);
                    return;
                }
            };
            for key in keys {
                let key = MetaStr::from_plain(&key);
                let entry = ForeignEntry {
                    bridge: self.bridge_weak(),
                    name: self.name().to_string(),
                    map: self.backing(),
                    key: key.clone(),
                };
                visit(&key, &entry);
            }
        })
    }

    fn remove(&self, key: &MetaStr) {
        self.with_object((), |bridge, obj| {
            let _session = bridge.enter();
            if let Err(err) = bridge.runtime().del_item(obj, &key.plain()) {
                // Removing an absent key is a no-op, like unsetting an
                // unset variable
                if !err.is_key_error() {
                    self.report_write_failure(bridge, err);
                }
            }
        })
    }

    fn replace(&self, table: &[(MetaStr, MetaStr)]) {
        self.with_object((), |bridge, obj| {
            let _session = bridge.enter();
            let rt = bridge.runtime();
            let old_keys = match rt.mapping_keys(obj) {
                Ok(keys) => keys,
                Err(err) => {
                    self.report_write_failure(bridge, err);
                    return;
                }
            };
            // Delete-all then insert-all. Not atomic: a failure leaves
            // whatever had already been applied in place.
            for key in old_keys {
                if let Err(err) = rt.del_item(obj, &key) {
                    self.report_write_failure(bridge, err);
                    return;
                }
            }
            for (key, value) in table {
                let obj_value = encoding::encode(rt, value);
                let result = rt.set_item(obj, &key.plain(), obj_value);
                rt.decref(obj_value);
                if let Err(err) = result {
                    self.report_write_failure(bridge, err);
                    return;
                }
            }
        })
    }
}
