//! Cache key derivation

/// Longest key the cache will derive
const MAX_KEY_LEN: usize = 80;

/// Fallback key for labels that sanitize to nothing
const FALLBACK_KEY: &str = "map";

/// Derive a filesystem-safe cache key from a raw label
///
/// Deterministic and total: lower-cases the input, collapses every run of
/// non-alphanumeric characters into a single `-`, trims leading and
/// trailing separators and truncates to 80 characters. Labels that
/// collapse to nothing yield the literal key `map`.
///
/// Two different raw labels collide exactly when their sanitized forms are
/// identical. That is accepted: in practice the only label source is the
/// provider's own size/seed pair, which sanitizes injectively.
pub fn sanitize_key(raw: &str) -> String {
    let mut key = String::with_capacity(raw.len().min(MAX_KEY_LEN));
    let mut pending_separator = false;

    for c in raw.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_separator && !key.is_empty() {
                key.push('-');
            }
            pending_separator = false;
            key.push(c.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
        if key.len() >= MAX_KEY_LEN {
            break;
        }
    }

    key.truncate(MAX_KEY_LEN);
    if key.is_empty() {
        return FALLBACK_KEY.to_string();
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_and_collapses_runs() {
        assert_eq!(sanitize_key("Size 3500 / Seed 42"), "size-3500-seed-42");
        assert_eq!(sanitize_key("3500-42"), "3500-42");
        assert_eq!(sanitize_key("A---B"), "a-b");
    }

    #[test]
    fn trims_leading_and_trailing_separators() {
        assert_eq!(sanitize_key("  3500-42!!"), "3500-42");
        assert_eq!(sanitize_key("__map__"), "map");
    }

    #[test]
    fn empty_and_symbol_only_labels_fall_back() {
        assert_eq!(sanitize_key(""), "map");
        assert_eq!(sanitize_key("   "), "map");
        assert_eq!(sanitize_key("???"), "map");
    }

    #[test]
    fn truncates_to_eighty_chars() {
        let long = "x".repeat(200);
        let key = sanitize_key(&long);
        assert_eq!(key.len(), 80);
    }

    #[test]
    fn output_alphabet_is_restricted() {
        let key = sanitize_key("Größe=3500 & Seed=42 \u{1F5FA}");
        assert!(!key.is_empty());
        assert!(key.len() <= 80);
        assert!(
            key.chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        );
    }
}
