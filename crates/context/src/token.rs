//! Token estimation for prompt budgeting.
//!
//! Counts roughly four bytes per token, rounded up. Close enough for BPE
//! tokenizers on English prose, markdown and SQL, and it never needs a
//! vocabulary file.

/// Estimate the token count for a string.
pub fn estimate_tokens(text: &str) -> usize {
    text.len().div_ceil(4)
}

/// Estimate tokens for several fragments rendered back to back.
pub fn estimate_joined(parts: &[&str]) -> usize {
    estimate_tokens(&parts.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sql_statement() {
        assert_eq!(estimate_tokens(""), 0);
        // 17 bytes
        assert_eq!(estimate_tokens("SELECT id FROM t;"), 5);
        // 16 bytes
        assert_eq!(estimate_tokens("SELECT 1 FROM t;"), 4);
    }

    #[test]
    fn markdown_context_lines() {
        assert_eq!(estimate_tokens("## Database Schema"), 5);
        assert_eq!(estimate_tokens("- order_id: bigint [PK]"), 6);
    }

    #[test]
    fn counts_bytes_not_chars() {
        // "café" is four chars but five bytes
        assert_eq!(estimate_tokens("café"), 2);
    }

    #[test]
    fn joined_is_estimated_as_one_string() {
        // 3 + 3 chars: separately 1 + 1, together ceil(6 / 4) = 2
        assert_eq!(estimate_joined(&["abc", "def"]), 2);
        assert_eq!(estimate_joined(&["## Examples\n", "SELECT 1;"]), 6);
    }
}
