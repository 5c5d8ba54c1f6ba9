//! Key helpers for prefix scans.

/// Build an unambiguous scope prefix from identifier segments.
///
/// Each segment is written as `<len>:<segment>:` so identifiers that contain
/// the separator can never collide (`"a:b" + "c"` vs `"a" + "b:c"`).
pub fn scope_key(segments: &[&str]) -> String {
    let mut key = String::new();
    for segment in segments {
        key.push_str(&segment.len().to_string());
        key.push(':');
        key.push_str(segment);
        key.push(':');
    }
    key
}

/// Calculate the exclusive end bound for a prefix range query.
///
/// Given prefix "agent-001:", returns "agent-001;" (next ASCII char after ':').
pub fn prefix_end_bound(prefix: &str) -> String {
    if prefix.is_empty() {
        return String::new();
    }

    let mut bytes = prefix.as_bytes().to_vec();
    if let Some(last) = bytes.last_mut() {
        *last = last.saturating_add(1);
    }

    String::from_utf8(bytes).unwrap_or_else(|_| format!("{}\x7F", prefix))
}

/// Create a prefix range for redb queries.
pub fn prefix_range(prefix: &str) -> (String, String) {
    (prefix.to_string(), prefix_end_bound(prefix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_end_bound() {
        assert_eq!(prefix_end_bound("user:"), "user;");
        assert_eq!(prefix_end_bound(""), "");
    }

    #[test]
    fn test_scope_key_is_unambiguous() {
        assert_eq!(scope_key(&["alice", "s1"]), "5:alice:2:s1:");
        assert_ne!(scope_key(&["a:b", "c"]), scope_key(&["a", "b:c"]));
    }
}
