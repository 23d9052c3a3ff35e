//! Builds glob matchers from `.gitignore`-style patterns.

use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::HashSet;

/// Builds a `GlobSet` from a set of `.gitignore`-style patterns.
///
/// Patterns are anchored anywhere in the relative path (`*.log` becomes
/// `**/*.log`). A trailing slash marks a directory pattern, which matches the
/// directory itself and everything below it. Blank lines and `#` comments are
/// skipped; invalid patterns are logged and dropped.
pub fn build_globset_from_patterns(patterns: &HashSet<String>) -> GlobSet {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let trimmed_pattern = pattern.trim();
        if trimmed_pattern.is_empty() || trimmed_pattern.starts_with('#') {
            continue;
        }

        let globs = match trimmed_pattern.strip_suffix('/') {
            Some(dir_pattern) => vec![format!("**/{dir_pattern}"), format!("**/{dir_pattern}/**")],
            // A bare name like `node_modules` also hides its contents.
            None => vec![
                format!("**/{trimmed_pattern}"),
                format!("**/{trimmed_pattern}/**"),
            ],
        };

        for glob in globs {
            match Glob::new(&glob) {
                Ok(glob) => {
                    builder.add(glob);
                }
                Err(e) => tracing::warn!("Skipping invalid ignore pattern '{}': {}", pattern, e),
            }
        }
    }

    builder.build().unwrap_or_else(|e| {
        tracing::error!("Failed to build glob set from patterns: {}", e);
        GlobSet::empty()
    })
}

/// Returns `true` if a slash-joined relative path is matched by the set.
pub fn is_ignored(ignore_set: &GlobSet, relative_path: &str) -> bool {
    !ignore_set.is_empty() && ignore_set.is_match(relative_path)
}
