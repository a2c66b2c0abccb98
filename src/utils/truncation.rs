/// Cut `text` to at most `max` characters, appending a marker when shortened.
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        None => text.to_string(),
        Some((idx, _)) => format!("{}...", &text[..idx]),
    }
}

/// The byte range `[at - radius, at + radius)` of `text`, clamped to the text
/// and widened outward to char boundaries.
pub fn window(text: &str, at: usize, radius: usize) -> &str {
    let at = at.min(text.len());
    let mut start = at.saturating_sub(radius);
    while start > 0 && !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = (at + radius).min(text.len());
    while end < text.len() && !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
}
