// src/utils.rs
// Utility functions module

// ============================================================================
// Text utilities
// ============================================================================

/// Keep the first `max_chars` characters (not bytes) of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// Like `truncate_chars`, appending `...` when anything was cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    let head = truncate_chars(text, max_chars);
    if head.len() < text.len() {
        format!("{}...", head)
    } else {
        head.to_string()
    }
}
