//! Pattern-based batch renaming of a flat file selection.
//!
//! A pattern is a template where `$N` stands for the original name without
//! its extension and `#` for the 1-based position in the selection. The
//! original extension is always appended, so `$N_#` turns `photo.jpg` (first
//! in the list) into `photo_1.jpg`.

use super::error::CoreError;
use super::ingest::IngestedEntry;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

pub const DEFAULT_PATTERN: &str = "$N_#";

/// Splits a file name into `(stem, extension)`, the extension keeping its dot.
///
/// Splits at the last `.` unless it is the first character, so dotfiles such
/// as `.bashrc` have no extension.
pub fn split_name(name: &str) -> (&str, &str) {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name.split_at(idx),
        _ => (name, ""),
    }
}

/// Expands `pattern` for one file.
pub fn apply_pattern(pattern: &str, stem: &str, number: usize, extension: &str) -> String {
    let number = number.to_string();
    let mut result = String::with_capacity(pattern.len() + stem.len() + extension.len());
    let mut rest = pattern;

    // Single pass over the pattern, so a `#` inside the stem stays literal.
    while let Some(ch) = rest.chars().next() {
        if let Some(after) = rest.strip_prefix("$N") {
            result.push_str(stem);
            rest = after;
        } else if ch == '#' {
            result.push_str(&number);
            rest = &rest[1..];
        } else {
            result.push(ch);
            rest = &rest[ch.len_utf8()..];
        }
    }

    result.push_str(extension);
    result
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct RenameItem {
    pub source: PathBuf,
    pub original_name: String,
    pub stem: String,
    pub extension: String,
    pub new_name: String,
}

/// The ordered renames for a selection under one pattern.
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RenamePlan {
    pub pattern: String,
    pub items: Vec<RenameItem>,
}

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct RenameReport {
    pub written: Vec<PathBuf>,
    /// Source file and the reason its copy failed.
    pub failed: Vec<(PathBuf, String)>,
}

impl RenamePlan {
    pub fn from_entries(entries: &[IngestedEntry], pattern: &str) -> Self {
        let items = entries
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let original_name = entry.name().to_string();
                let (stem, extension) = split_name(&original_name);
                RenameItem {
                    source: entry.handle.clone(),
                    new_name: apply_pattern(pattern, stem, i + 1, extension),
                    stem: stem.to_string(),
                    extension: extension.to_string(),
                    original_name,
                }
            })
            .collect();

        Self {
            pattern: pattern.to_string(),
            items,
        }
    }

    /// Recomputes every new name for a different pattern, keeping the order.
    pub fn with_pattern(mut self, pattern: &str) -> Self {
        for (i, item) in self.items.iter_mut().enumerate() {
            item.new_name = apply_pattern(pattern, &item.stem, i + 1, &item.extension);
        }
        self.pattern = pattern.to_string();
        self
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Copies every source into `target_dir` under its new name.
    ///
    /// A failed copy is recorded and the remaining files are still processed.
    pub async fn apply(&self, target_dir: &Path, cancel_flag: &AtomicBool) -> Result<RenameReport, CoreError> {
        let metadata = tokio::fs::metadata(target_dir)
            .await
            .map_err(|e| CoreError::Io(e, target_dir.to_path_buf()))?;
        if !metadata.is_dir() {
            return Err(CoreError::NotADirectory(target_dir.to_path_buf()));
        }

        let mut report = RenameReport::default();
        for item in &self.items {
            if cancel_flag.load(Ordering::Relaxed) {
                return Err(CoreError::Cancelled);
            }

            let destination = target_dir.join(&item.new_name);
            match tokio::fs::copy(&item.source, &destination).await {
                Ok(_) => {
                    tracing::debug!("Copied {:?} -> {:?}", item.source, destination);
                    report.written.push(destination);
                }
                Err(e) => {
                    tracing::warn!("Failed to write {:?}: {}", destination, e);
                    report.failed.push((item.source.clone(), e.to_string()));
                }
            }
        }

        tracing::info!(
            "Renamed {} files into {:?} ({} failed)",
            report.written.len(),
            target_dir,
            report.failed.len()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_split_name() {
        assert_eq!(split_name("photo.jpg"), ("photo", ".jpg"));
        assert_eq!(split_name("archive.tar.gz"), ("archive.tar", ".gz"));
        assert_eq!(split_name("README"), ("README", ""));
        assert_eq!(split_name(".bashrc"), (".bashrc", ""));
        assert_eq!(split_name("trailing."), ("trailing", "."));
    }

    #[test]
    fn test_apply_pattern() {
        assert_eq!(apply_pattern("$N_#", "photo", 1, ".jpg"), "photo_1.jpg");
        assert_eq!(apply_pattern("Photo_#_$N", "beach", 12, ".png"), "Photo_12_beach.png");
        assert_eq!(apply_pattern("#-#", "x", 3, ""), "3-3");
        assert_eq!(apply_pattern("plain", "x", 3, ".txt"), "plain.txt");
        assert_eq!(apply_pattern("$N", "tag#1", 2, ".md"), "tag#1.md");
        assert_eq!(apply_pattern("€_$N", "ü", 1, ""), "€_ü");
    }

    #[test]
    fn test_plan_numbers_in_selection_order() {
        let entries = vec![
            IngestedEntry::new("b.txt", "/src/b.txt", 1, None),
            IngestedEntry::new("a.png", "/src/a.png", 1, None),
            IngestedEntry::new(".env", "/src/.env", 1, None),
        ];
        let plan = RenamePlan::from_entries(&entries, "$N_#");
        let names: Vec<_> = plan.items.iter().map(|i| i.new_name.as_str()).collect();
        assert_eq!(names, vec!["b_1.txt", "a_2.png", ".env_3"]);

        let plan = plan.with_pattern("file#");
        let names: Vec<_> = plan.items.iter().map(|i| i.new_name.as_str()).collect();
        assert_eq!(names, vec!["file1.txt", "file2.png", "file3"]);
        assert_eq!(plan.pattern, "file#");
    }

    #[tokio::test]
    async fn test_apply_copies_and_continues_past_failures() {
        let source = tempdir().unwrap();
        let target = tempdir().unwrap();
        fs::write(source.path().join("one.txt"), "1").unwrap();
        fs::write(source.path().join("two.txt"), "2").unwrap();

        let entries = vec![
            IngestedEntry::new("one.txt", source.path().join("one.txt"), 1, None),
            IngestedEntry::new("gone.txt", source.path().join("gone.txt"), 1, None),
            IngestedEntry::new("two.txt", source.path().join("two.txt"), 1, None),
        ];
        let plan = RenamePlan::from_entries(&entries, "doc_#");
        let report = plan.apply(target.path(), &AtomicBool::new(false)).await.unwrap();

        assert_eq!(report.written.len(), 2);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(fs::read_to_string(target.path().join("doc_1.txt")).unwrap(), "1");
        assert_eq!(fs::read_to_string(target.path().join("doc_3.txt")).unwrap(), "2");
        // Sources are left in place.
        assert!(source.path().join("one.txt").exists());
    }

    #[tokio::test]
    async fn test_apply_rejects_missing_target() {
        let dir = tempdir().unwrap();
        let plan = RenamePlan::default();
        let missing = dir.path().join("nope");
        let result = plan.apply(&missing, &AtomicBool::new(false)).await;
        assert!(matches!(result, Err(CoreError::Io(_, _))));

        let file = dir.path().join("file.txt");
        fs::write(&file, "x").unwrap();
        let result = plan.apply(&file, &AtomicBool::new(false)).await;
        assert!(matches!(result, Err(CoreError::NotADirectory(_))));
    }

    #[tokio::test]
    async fn test_apply_honours_cancellation() {
        let dir = tempdir().unwrap();
        let entries = vec![IngestedEntry::new("a.txt", dir.path().join("a.txt"), 1, None)];
        let plan = RenamePlan::from_entries(&entries, "$N");
        let result = plan.apply(dir.path(), &AtomicBool::new(true)).await;
        assert!(matches!(result, Err(CoreError::Cancelled)));
    }
}
