//! Utility functions and helpers

/// Check that a string is non-empty ASCII hex
pub fn is_hex(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Sanitize string for logging (remove sensitive data)
pub fn sanitize_for_logging(s: &str) -> String {
    if s.len() <= 12 {
        return s.to_string();
    }

    // Signed URLs carry credentials in the query string
    if let Some((base, _)) = s.split_once('?') {
        return format!("{}?...", base);
    }

    match s.char_indices().nth(12) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Parse a stored JSON array of strings, ignoring anything else
///
/// Non-string members are dropped; a value that is not a JSON array yields `None`.
pub fn parse_string_list(raw: &str) -> Option<Vec<String>> {
    match serde_json::from_str::<serde_json::Value>(raw).ok()? {
        serde_json::Value::Array(items) => Some(
            items
                .into_iter()
                .filter_map(|v| match v {
                    serde_json::Value::String(s) => Some(s),
                    _ => None,
                })
                .collect(),
        ),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_hex() {
        assert!(is_hex("deadBEEF0123"));
        assert!(!is_hex(""));
        assert!(!is_hex("xyz"));
    }

    #[test]
    fn test_sanitize_for_logging() {
        assert_eq!(sanitize_for_logging("short"), "short");
        assert_eq!(
            sanitize_for_logging("https://cdn.example.com/b/k.zip?expires=1&token=abc"),
            "https://cdn.example.com/b/k.zip?..."
        );
        assert_eq!(sanitize_for_logging("device-0123456789"), "device-01234...");
    }

    #[test]
    fn test_parse_string_list() {
        assert_eq!(
            parse_string_list(r#"["a", 1, "b"]"#),
            Some(vec!["a".to_string(), "b".to_string()])
        );
        assert_eq!(parse_string_list("{}"), None);
        assert_eq!(parse_string_list("not json"), None);
    }
}
