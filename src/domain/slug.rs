//! Filename slugs derived from titles

/// Converts a title into a filesystem-safe slug.
///
/// Lowercases, drops everything but alphanumerics, whitespace, and hyphens,
/// then collapses whitespace/underscore runs into single hyphens.
/// An empty or all-symbol title produces `"untitled"` so the slug is always
/// usable in a filename.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_was_hyphen = true; // suppress leading hyphens

    for ch in text.trim().to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
            last_was_hyphen = false;
        } else if ch.is_whitespace() || ch == '_' || ch == '-' {
            if !last_was_hyphen {
                slug.push('-');
                last_was_hyphen = true;
            }
        }
        // Everything else (punctuation, symbols) is dropped
    }

    while slug.ends_with('-') {
        slug.pop();
    }

    if slug.is_empty() {
        "untitled".to_string()
    } else {
        slug
    }
}
