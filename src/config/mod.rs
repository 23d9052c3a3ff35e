pub mod settings;

use crate::core::{SortKey, SortOrder};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::PathBuf;

pub const DEFAULT_EXPORT_BASENAME: &str = "files-folders-export";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    /// `.gitignore`-style patterns left out of every ingestion.
    pub ignore_patterns: HashSet<String>,
    pub follow_links: bool,
    /// Open every folder when a new tree is loaded.
    pub expand_all_on_load: bool,
    /// Show a selected folder even when it holds no files.
    pub keep_empty_root: bool,
    pub default_sort_key: SortKey,
    pub default_sort_order: SortOrder,
    pub export_directory: Option<PathBuf>,
    pub export_basename: String,
    pub export_include_metadata: bool,
    pub export_include_stats: bool,
    pub rename_pattern: String,
    /// Files discovered between two progress reports.
    pub progress_interval: usize,
}

impl AppConfig {
    /// The export directory, falling back to the home directory.
    pub fn resolved_export_directory(&self) -> PathBuf {
        self.export_directory
            .clone()
            .or_else(dirs::download_dir)
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            ignore_patterns: HashSet::new(),
            follow_links: false,
            expand_all_on_load: true,
            keep_empty_root: false,
            default_sort_key: SortKey::Name,
            default_sort_order: SortOrder::Ascending,
            export_directory: dirs::download_dir(),
            export_basename: DEFAULT_EXPORT_BASENAME.to_string(),
            export_include_metadata: true,
            export_include_stats: true,
            rename_pattern: crate::core::rename::DEFAULT_PATTERN.to_string(),
            progress_interval: 25,
        }
    }
}
