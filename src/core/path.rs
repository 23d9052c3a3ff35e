//! Splits slash-separated relative paths into normalized segments.

use std::fmt;

/// The ordered segments of a relative path, root to leaf.
///
/// Never empty: the last segment is the leaf (file) name and every preceding
/// segment names an ancestor folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PathSegments(Vec<String>);

impl PathSegments {
    /// Parses a relative path such as `proj/img/logo.png`.
    ///
    /// Both `/` and `\` separate segments. Empty segments (leading, trailing or
    /// doubled separators) and `.` segments are dropped, so inconsistent path
    /// strings from different listing sources normalize to the same result.
    /// Returns `None` when nothing is left.
    pub fn parse(relative_path: &str) -> Option<Self> {
        let segments: Vec<String> = relative_path
            .split(['/', '\\'])
            // Manifests written on Windows leave a trailing `\r` on each line.
            .map(|segment| segment.trim_end_matches('\r'))
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .map(str::to_string)
            .collect();

        if segments.is_empty() {
            None
        } else {
            Some(Self(segments))
        }
    }

    /// The leaf name.
    pub fn leaf(&self) -> &str {
        // Non-empty by construction.
        &self.0[self.0.len() - 1]
    }

    /// Ancestor folder names, root first.
    pub fn ancestors(&self) -> &[String] {
        &self.0[..self.0.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`; present for API symmetry with `len`.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// The joined path of the first `n` segments.
    pub fn prefix(&self, n: usize) -> String {
        self.0[..n.min(self.0.len())].join("/")
    }

    /// The normalized, slash-joined path.
    pub fn joined(&self) -> String {
        self.0.join("/")
    }
}

impl fmt::Display for PathSegments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.joined())
    }
}

/// Returns the parent part of a normalized path, or `None` for a root-level path.
pub fn parent_path(path: &str) -> Option<&str> {
    path.rfind('/').map(|idx| &path[..idx])
}

/// Joins a parent path and a child name, treating an empty parent as the root.
pub fn join_path(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}/{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_splits_into_ancestors_and_leaf() {
        let segments = PathSegments::parse("proj/img/logo.png").unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments.leaf(), "logo.png");
        assert_eq!(segments.ancestors(), &["proj".to_string(), "img".to_string()]);
        assert_eq!(segments.prefix(2), "proj/img");
    }

    #[test]
    fn test_parse_without_separator_is_single_segment() {
        let segments = PathSegments::parse("readme.txt").unwrap();
        assert_eq!(segments.len(), 1);
        assert_eq!(segments.leaf(), "readme.txt");
        assert!(segments.ancestors().is_empty());
    }

    #[test]
    fn test_parse_collapses_empty_segments() {
        let segments = PathSegments::parse("/proj//img/./logo.png/").unwrap();
        assert_eq!(segments.joined(), "proj/img/logo.png");
    }

    #[test]
    fn test_parse_accepts_backslashes() {
        let segments = PathSegments::parse("proj\\src\\main.rs").unwrap();
        assert_eq!(segments.joined(), "proj/src/main.rs");
    }

    #[test]
    fn test_parse_empty_input_is_none() {
        assert!(PathSegments::parse("").is_none());
        assert!(PathSegments::parse("///").is_none());
        assert!(PathSegments::parse("./.").is_none());
    }

    #[test]
    fn test_parent_and_join() {
        assert_eq!(parent_path("a/b/c.txt"), Some("a/b"));
        assert_eq!(parent_path("c.txt"), None);
        assert_eq!(join_path("", "a"), "a");
        assert_eq!(join_path("a/b", "c.txt"), "a/b/c.txt");
    }
}
