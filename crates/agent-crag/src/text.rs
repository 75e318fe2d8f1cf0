//! Text helpers

/// Longest prefix of `text` holding at most `max_chars` characters
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_excerpt_short_text_untouched() {
        assert_eq!(excerpt("AAPL", 10), "AAPL");
        assert_eq!(excerpt("", 3), "");
    }

    #[test]
    fn test_excerpt_counts_characters_not_bytes() {
        assert_eq!(excerpt("héllo wörld", 7), "héllo w");
        assert_eq!(excerpt("€€€€", 2), "€€");
    }

    #[test]
    fn test_excerpt_zero() {
        assert_eq!(excerpt("anything", 0), "");
    }
}
