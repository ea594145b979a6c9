//! Identifier sanitization: maps IR tensor/variable names to
//! target-legal C/CUDA identifiers. Injective over a single compilation
//! since every IR name is already unique (tensor names are the `TensorDefs`
//! key, iteration-variable names carry a per-construction prefix).

/// Replaces any byte that isn't `[A-Za-z0-9_]` with `_`, and prefixes a
/// leading underscore if the first character would otherwise be a digit.
pub fn make_identifier(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        if first.is_ascii_digit() {
            out.push('_');
        }
        out.push(if first.is_ascii_alphanumeric() || first == '_' { first } else { '_' });
    }
    for c in chars {
        out.push(if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' });
    }
    out
}
