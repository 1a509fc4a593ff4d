//! Catalog identity handling.
//!
//! Catalog ids are a one-letter type prefix followed by a number
//! (`v17` for a VN, `c1234` for a character). Users may type the bare
//! number; every entry point that accepts an id goes through
//! [`canonical_id`] so the rest of the system only ever sees the prefixed
//! form.

/// Type prefix of VN ids.
pub const VN_PREFIX: char = 'v';

/// Return `raw` in its prefixed form.
///
/// Surrounding whitespace is trimmed. An id that already carries `prefix`
/// is returned as-is.
pub fn canonical_id(prefix: char, raw: &str) -> String {
    let raw = raw.trim();
    if raw.starts_with(prefix) {
        raw.to_string()
    } else {
        format!("{}{}", prefix, raw)
    }
}

/// Shorthand for [`canonical_id`] with [`VN_PREFIX`].
pub fn canonical_vn_id(raw: &str) -> String {
    canonical_id(VN_PREFIX, raw)
}

/// Numeric part of an id (`"v10"` → `Some(10)`).
///
/// Returns `None` when the id has no prefix letter or the remainder is not
/// a number.
pub fn numeric_suffix(id: &str) -> Option<u64> {
    let mut chars = id.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => chars.as_str().parse().ok(),
        _ => None,
    }
}

/// Sort key that orders ids numerically (`v2` before `v10`).
///
/// Malformed ids sort after every well-formed one, by their raw text.
pub fn id_sort_key(id: &str) -> (u64, String) {
    (numeric_suffix(id).unwrap_or(u64::MAX), id.to_string())
}
