/// Truncate to at most `max_chars` characters. Counts chars, not bytes, so
/// accented Portuguese text is never split mid-codepoint.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((end, _)) => s[..end].to_string(),
        None => s.to_string(),
    }
}

/// Trim and truncate an optional free-text field; blank input becomes `None`.
pub fn clean_optional(value: Option<&str>, max_chars: usize) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(|v| truncate_chars(v, max_chars))
}
