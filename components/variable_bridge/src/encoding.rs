//! Conversions between metafied host strings and foreign byte strings.
//!
//! The foreign side always sees plain bytes: host values are unmetafied
//! on the way out and re-metafied on the way in, so reserved sentinel
//! bytes never leak across the boundary in either direction.

use foreign_runtime::{ObjRef, Runtime};
use host_types::MetaStr;

use crate::error::{BridgeError, BridgeResult};

/// Builds a foreign byte string from a metafied host string. Returns a
/// +1 reference the caller releases.
pub fn encode(rt: &Runtime, value: &MetaStr) -> ObjRef {
    rt.new_bytes(&value.plain())
}

/// Metafies a foreign object's text into a host string. Byte strings are
/// taken verbatim; anything else goes through the represent-as-text
/// protocol first.
pub fn decode(rt: &Runtime, obj: ObjRef) -> BridgeResult<MetaStr> {
    if let Some(bytes) = rt.as_bytes(obj) {
        return Ok(MetaStr::from_plain(&bytes));
    }
    match rt.str_bytes(obj) {
        Ok(bytes) => Ok(MetaStr::from_plain(&bytes)),
        Err(err) => Err(BridgeError::Conversion(err.to_string())),
    }
}
