//! Tagged representation of host variable values.

use crate::MetaStr;

/// A host variable value, in the shape the variable machinery supplies
/// and receives.
///
/// Maps are insertion-ordered pair lists; the host never relies on a hash
/// iteration order when handing a whole table across the bridge.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// String scalar, metafied
    Scalar(MetaStr),
    /// Integer number
    Integer(i64),
    /// Floating-point number
    Float(f64),
    /// Ordered array of metafied strings
    Array(Vec<MetaStr>),
    /// Associative map of metafied strings, insertion-ordered
    Map(Vec<(MetaStr, MetaStr)>),
}

impl HostValue {
    /// Human-readable name of the value's type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Scalar(_) => "scalar",
            HostValue::Integer(_) => "integer",
            HostValue::Float(_) => "float",
            HostValue::Array(_) => "array",
            HostValue::Map(_) => "association",
        }
    }

    /// The value rendered as a single metafied string, the way the host
    /// stringifies any variable (arrays join on space, maps join pairs).
    pub fn as_scalar(&self) -> MetaStr {
        match self {
            HostValue::Scalar(s) => s.clone(),
            HostValue::Integer(n) => MetaStr::from_plain(n.to_string().as_bytes()),
            HostValue::Float(f) => MetaStr::from_plain(format_float(*f).as_bytes()),
            HostValue::Array(items) => join_metafied(items.iter()),
            HostValue::Map(pairs) => {
                join_metafied(pairs.iter().flat_map(|(k, v)| [k, v].into_iter()))
            }
        }
    }
}

fn join_metafied<'a>(items: impl Iterator<Item = &'a MetaStr>) -> MetaStr {
    let mut buf = Vec::new();
    for (i, item) in items.enumerate() {
        if i > 0 {
            buf.push(b' ');
        }
        buf.extend_from_slice(item.as_bytes());
    }
    MetaStr::from_metafied(buf)
}

/// Formats a float the way the host prints float variables: a plain
/// decimal form that always carries a fractional part or exponent.
fn format_float(f: f64) -> String {
    if f == f.trunc() && f.is_finite() && f.abs() < 1e15 {
        format!("{:.1}", f)
    } else {
        format!("{}", f)
    }
}
