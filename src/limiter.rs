//! Truncates tool output that would otherwise be handed to the agent
//! unbounded. Any single call's output is capped at 30,000 characters; past
//! the cap a marker suffix replaces the remainder.

pub const MAX_OUTPUT_CHARS: usize = 30_000;
const TRUNCATION_MARKER: &str = "\n[output truncated]";

/// Truncate `s` to at most `MAX_OUTPUT_CHARS` characters, appending
/// [`TRUNCATION_MARKER`] when truncation occurs. Operates on character
/// boundaries (not bytes) so multi-byte UTF-8 is never split.
pub fn limit_output(s: &str) -> String {
    let char_count = s.chars().count();
    if char_count <= MAX_OUTPUT_CHARS {
        return s.to_string();
    }
    let truncated: String = s.chars().take(MAX_OUTPUT_CHARS).collect();
    format!("{truncated}{TRUNCATION_MARKER}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_output_is_unchanged() {
        assert_eq!(limit_output("hello"), "hello");
    }

    #[test]
    fn output_at_exactly_the_cap_is_unchanged() {
        let s = "a".repeat(MAX_OUTPUT_CHARS);
        assert_eq!(limit_output(&s), s);
    }

    #[test]
    fn output_over_the_cap_is_truncated_with_marker() {
        let s = "a".repeat(MAX_OUTPUT_CHARS + 100);
        let result = limit_output(&s);
        assert!(result.ends_with(TRUNCATION_MARKER));
        assert!(result.chars().count() <= MAX_OUTPUT_CHARS + TRUNCATION_MARKER.len());
    }

    #[test]
    fn multibyte_characters_are_not_split() {
        let s = "é".repeat(MAX_OUTPUT_CHARS + 10);
        let result = limit_output(&s);
        assert!(result.is_char_boundary(result.len() - TRUNCATION_MARKER.len()));
    }
}
