use hookrelay_protocol::MAX_THREAD_NAME_CHARS;

const SESSION_ID_CHARS: usize = 8;

/// Deterministic thread name for a session: `"<prefix> <first 8 chars>"`.
///
/// Every invocation for the same session derives the same name, which is
/// what lets remote discovery find a thread no local record knows about.
pub fn thread_name(prefix: &str, session_id: &str) -> String {
    let prefix = prefix.split_whitespace().collect::<Vec<_>>().join(" ");
    let short_id: String = session_id.trim().chars().take(SESSION_ID_CHARS).collect();

    let name = if prefix.is_empty() {
        short_id
    } else {
        format!("{prefix} {short_id}")
    };
    name.chars().take(MAX_THREAD_NAME_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::thread_name;

    #[test]
    fn uses_prefix_and_first_eight_chars() {
        assert_eq!(
            thread_name("Session", "abc12345-6789-4def-8000-000000000000"),
            "Session abc12345"
        );
        assert_eq!(thread_name("Session", "abc"), "Session abc");
    }

    #[test]
    fn normalizes_prefix_whitespace() {
        assert_eq!(thread_name("  Claude   Code ", "abc12345"), "Claude Code abc12345");
        assert_eq!(thread_name("", "abc12345"), "abc12345");
    }

    #[test]
    fn caps_length_at_platform_limit() {
        let prefix = "p".repeat(150);
        let name = thread_name(&prefix, "abc12345");
        assert_eq!(name.chars().count(), 100);
    }
}
