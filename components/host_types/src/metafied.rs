//! Metafied byte strings.
//!
//! The host keeps variable contents in a "metafied" form: a reserved range
//! of byte values never appears literally. A byte that falls in the
//! reserved range (or NUL) is stored as the two-byte sequence
//! `META, byte ^ 0x20`. This keeps the internal representation free of the
//! sentinel bytes the host's tokenizer claims for itself while still
//! allowing arbitrary binary content to round-trip.

/// Escape sentinel. Never appears literally in metafied content.
pub const META: u8 = 0x83;

/// Last byte of the reserved range claimed by the host tokenizer.
pub const MARKER: u8 = 0xA2;

/// Mask applied to a byte when it is stored after a [`META`] sentinel.
const META_MASK: u8 = 0x20;

/// Returns whether a plain byte must be escaped in metafied form.
///
/// NUL is escaped so metafied content is always NUL-free; the
/// `META..=MARKER` range is escaped because those values are sentinels.
pub fn needs_meta(byte: u8) -> bool {
    byte == 0 || (META..=MARKER).contains(&byte)
}

/// A metafied byte string.
///
/// The invariant is that the underlying buffer never contains a reserved
/// byte except as the first half of an escape pair. Construction goes
/// through [`MetaStr::from_plain`] (which escapes) or
/// [`MetaStr::from_metafied`] (which trusts already-metafied input, e.g.
/// content taken from another `MetaStr`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MetaStr(Vec<u8>);

impl MetaStr {
    /// Metafies a plain byte sequence.
    ///
    /// Single pass over the input with the output capacity computed up
    /// front; the result is at most twice the input length.
    pub fn from_plain(bytes: &[u8]) -> Self {
        let extra = bytes.iter().filter(|&&b| needs_meta(b)).count();
        let mut buf = Vec::with_capacity(bytes.len() + extra);
        for &b in bytes {
            if needs_meta(b) {
                buf.push(META);
                buf.push(b ^ META_MASK);
            } else {
                buf.push(b);
            }
        }
        MetaStr(buf)
    }

    /// Wraps bytes that are already in metafied form.
    pub fn from_metafied(bytes: Vec<u8>) -> Self {
        MetaStr(bytes)
    }

    /// Unmetafies back to the plain byte sequence.
    ///
    /// Capacity is computed up front by counting escape pairs. A trailing
    /// lone `META` (malformed input) is dropped rather than invented into
    /// a byte.
    pub fn plain(&self) -> Vec<u8> {
        let pairs = self
            .0
            .iter()
            .filter(|&&b| b == META)
            .count();
        let mut out = Vec::with_capacity(self.0.len() - pairs);
        let mut iter = self.0.iter();
        while let Some(&b) = iter.next() {
            if b == META {
                if let Some(&escaped) = iter.next() {
                    out.push(escaped ^ META_MASK);
                }
            } else {
                out.push(b);
            }
        }
        out
    }

    /// The metafied bytes themselves.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether the string is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lossy UTF-8 view of the plain content, for diagnostics.
    pub fn display(&self) -> String {
        String::from_utf8_lossy(&self.plain()).into_owned()
    }
}

impl From<&str> for MetaStr {
    fn from(s: &str) -> Self {
        MetaStr::from_plain(s.as_bytes())
    }
}

impl From<&[u8]> for MetaStr {
    fn from(bytes: &[u8]) -> Self {
        MetaStr::from_plain(bytes)
    }
}
