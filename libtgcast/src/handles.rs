//! Recipient handle parsing
//!
//! Handles arrive as free-form text: any run of commas, spaces, tabs or
//! newlines separates them. Order is preserved and duplicates are kept.

use std::path::Path;
use tracing::error;

/// Split free-form text into handles
///
/// # Examples
///
/// ```
/// use libtgcast::handles::parse_handles;
///
/// assert_eq!(parse_handles("a,b c\nd"), vec!["a", "b", "c", "d"]);
/// ```
pub fn parse_handles(input: &str) -> Vec<String> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|handle| !handle.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read handles from a file
///
/// An unreadable file is logged and yields an empty list; callers treat an
/// empty list as "nothing to send".
pub fn load_handles_from_file(path: &Path) -> Vec<String> {
    match std::fs::read_to_string(path) {
        Ok(content) => parse_handles(&content),
        Err(e) => {
            error!("Error reading file {}: {}", path.display(), e);
            Vec::new()
        }
    }
}

/// Recipient identifier sent to the platform: the handle without a leading `@`
pub fn normalize_handle(handle: &str) -> &str {
    handle.strip_prefix('@').unwrap_or(handle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mixed_delimiters() {
        assert_eq!(parse_handles("a,b c\nd"), vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_delimiter_choice_does_not_matter() {
        let expected = vec!["alice", "@bob", "carol"];
        for input in [
            "alice,@bob,carol",
            "alice @bob carol",
            "alice\n@bob\ncarol",
            "alice, @bob\r\n\tcarol",
            ",,alice,,, @bob  \n\n carol,",
        ] {
            assert_eq!(parse_handles(input), expected, "input: {:?}", input);
        }
    }

    #[test]
    fn test_empty_and_blank_input() {
        assert!(parse_handles("").is_empty());
        assert!(parse_handles(" ,\n\t, ").is_empty());
    }

    #[test]
    fn test_duplicates_preserved() {
        assert_eq!(parse_handles("a a,a"), vec!["a", "a", "a"]);
    }

    #[test]
    fn test_normalize_strips_single_leading_at() {
        assert_eq!(normalize_handle("@bob"), "bob");
        assert_eq!(normalize_handle("bob"), "bob");
        assert_eq!(normalize_handle(normalize_handle("@bob")), normalize_handle("bob"));
        assert_eq!(normalize_handle("@@bob"), "@bob");
        assert_eq!(normalize_handle("b@b"), "b@b");
    }

    #[test]
    fn test_load_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("handles.txt");
        std::fs::write(&path, "@one, two\nthree\n\nfour").unwrap();

        assert_eq!(
            load_handles_from_file(&path),
            vec!["@one", "two", "three", "four"]
        );
    }

    #[test]
    fn test_missing_file_yields_empty_list() {
        let dir = TempDir::new().unwrap();
        assert!(load_handles_from_file(&dir.path().join("missing.txt")).is_empty());
    }
}
