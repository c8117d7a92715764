//! Input validation utilities

/// Maximum length of an organization slug
pub const MAX_SLUG_LEN: usize = 48;

/// Default landing path after signing in
pub const DEFAULT_AFTER_LOGIN: &str = "/app";

/// Derive a URL slug from an organization name.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single `-`, strips leading and trailing dashes and truncates to
/// [`MAX_SLUG_LEN`]. May return an empty string (e.g. for `"!!!"`).
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut pending_dash = false;

    for c in name.trim().to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(c);
        } else {
            pending_dash = true;
        }
    }

    // Only ASCII is pushed, so byte truncation is safe.
    slug.truncate(MAX_SLUG_LEN);
    slug.trim_end_matches('-').to_string()
}

/// Trim a required name; `None` when nothing is left.
pub fn required_name(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Trim an optional free-text field; blank becomes absent.
pub fn optional_text(raw: Option<&str>) -> Option<String> {
    raw.and_then(required_name)
}

/// Accept a post-login redirect target only if it is a same-origin
/// relative path (one leading `/`, not `//`, no backslash tricks).
pub fn safe_next_path(next: Option<&str>) -> String {
    match next.map(str::trim) {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.starts_with("/\\")
                && !path.chars().any(char::is_control) =>
        {
            path.to_string()
        }
        _ => DEFAULT_AFTER_LOGIN.to_string(),
    }
}
