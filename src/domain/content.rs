pub const MAX_POST_CHARS: usize = 2200;
pub const MAX_COMMENT_CHARS: usize = 1000;
pub const MAX_NAME_CHARS: usize = 100;
pub const MAX_BIO_CHARS: usize = 500;
pub const MAX_SEARCH_CHARS: usize = 100;

/// Trims user-supplied text and enforces the non-empty and length rules.
/// The error is the client-facing message.
pub fn normalize_text(raw: &str, field: &str, max_chars: usize) -> Result<String, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(format!("{} cannot be empty", field));
    }
    if trimmed.chars().count() > max_chars {
        return Err(format!("{} must be at most {} characters", field, max_chars));
    }
    Ok(trimmed.to_string())
}

/// Empty optional references are treated as absent.
pub fn normalize_ref(raw: Option<String>) -> Option<String> {
    raw.map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Escapes `LIKE` wildcards so a search term matches literally; the query
/// must declare a backslash escape.
pub fn escape_like_pattern(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}
