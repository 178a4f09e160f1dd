use super::html::{decode_entities, strip_tags};

/// Canonicalize a person-name list (cast, director) into one space-separated string.
///
/// Accepted shapes:
/// - `"A, B, C"` (comma list, each segment trimmed)
/// - one name per line, possibly wrapped in markup
/// - a single opaque run of names with no separators, kept as-is
///
/// Returns `None` when nothing but markup or whitespace is left.
pub fn normalize_names(raw: Option<&str>) -> Option<String> {
    let raw = raw?;
    let cleaned = decode_entities(&strip_tags(raw));

    let tokens: Vec<String> = if cleaned.contains(',') {
        cleaned.split(',').filter_map(collapse).collect()
    } else {
        cleaned.lines().filter_map(collapse).collect()
    };

    if tokens.is_empty() {
        None
    } else {
        Some(tokens.join(" "))
    }
}

fn collapse(segment: &str) -> Option<String> {
    let joined = segment.split_whitespace().collect::<Vec<_>>().join(" ");
    (!joined.is_empty()).then_some(joined)
}
