//! Small shared helpers.

/// Convert a title to a snake_case file stem.
///
/// Non-alphanumeric runs collapse to a single underscore; leading and
/// trailing underscores are dropped.
pub fn to_snake_case(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    let mut pending_sep = false;

    for ch in title.chars() {
        if ch.is_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.extend(ch.to_lowercase());
        } else {
            pending_sep = true;
        }
    }

    if out.is_empty() {
        "render".to_string()
    } else {
        out
    }
}
