//! Variable identifier syntax.

/// Returns whether a name is a valid host variable identifier:
/// an ASCII letter or underscore followed by letters, digits or
/// underscores.
pub fn is_ident(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
