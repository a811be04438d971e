//! Utility helpers: path resolution and string manipulation.

use std::path::PathBuf;

/// `~/.lectio`, or `./.lectio` when no home directory is known.
pub fn get_data_path() -> PathBuf {
    let home = dirs_next::home_dir().unwrap_or_else(|| PathBuf::from("."));
    home.join(".lectio")
}

/// Cut `s` to at most `max_len` characters, ending in `...` when shortened.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.char_indices().nth(max_len).is_none() {
        return s.to_string();
    }
    let cut = s
        .char_indices()
        .nth(max_len.saturating_sub(3))
        .map_or(s.len(), |(i, _)| i);
    format!("{}...", &s[..cut])
}

/// Collapse runs of whitespace (including newlines) into single spaces.
pub fn squash_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_keeps_short_and_exact() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("hello", 5), "hello");
    }

    #[test]
    fn test_truncate_long_string() {
        let result = truncate_string("hello world, this is a long string", 15);
        assert_eq!(result, "hello world,...");
    }

    #[test]
    fn test_truncate_unicode() {
        assert_eq!(truncate_string("“quoted” text here", 8), "“quot...");
    }

    #[test]
    fn test_squash_whitespace() {
        assert_eq!(squash_whitespace("  For God\n  so   loved\t"), "For God so loved");
    }

    #[test]
    fn test_data_path_ends_with_lectio() {
        assert!(get_data_path().ends_with(".lectio"));
    }
}
