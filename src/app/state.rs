//! Defines the central, mutable state of the application.

use crate::config::AppConfig;
use crate::core::{
    BuildOutcome, Forest, IngestedEntry, ScanProgress, Selection, SortKey, SortOrder, TreeQuery,
};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Holds the complete, mutable state of the application.
///
/// This struct is wrapped in an `Arc<Mutex<...>>` so command handlers and
/// the background ingestion task can share it.
pub struct AppState {
    /// The application's configuration settings.
    pub config: AppConfig,
    /// Where configuration changes are persisted; the platform default when `None`.
    pub config_path: Option<PathBuf>,
    /// The canonical tree of the current selection, in build order.
    pub forest: Forest,
    /// The selected folder's name, when the selection was a single folder.
    pub root_name: Option<String>,
    /// Header label for the current selection.
    pub selection_label: String,
    /// The flat records of the current selection, kept for batch renaming.
    pub entries: Vec<IngestedEntry>,
    /// Folder paths the user has opened.
    pub expanded_paths: HashSet<String>,
    pub search_query: String,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    /// `true` while an ingestion task is running.
    pub is_ingesting: bool,
    pub ingest_progress: ScanProgress,
    pub status_message: String,
    /// Entries left out of the last ingestion because they could not be read.
    pub skipped_entries: usize,
    /// Records rejected by the builder during the last ingestion.
    pub conflicts: usize,
    /// Incremented by every new ingestion; results from older ones are discarded.
    pub generation: u64,
    /// A handle to the running ingestion task, allowing it to be aborted.
    pub ingest_task: Option<JoinHandle<()>>,
    /// A flag used to signal cancellation to the ingestion task.
    pub ingest_cancellation_flag: Arc<AtomicBool>,
    /// Directory that batch-renamed copies are written into.
    pub rename_target: Option<PathBuf>,
    pub rename_pattern: String,
    pub last_export: Option<PathBuf>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(AppConfig::default())
    }
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        Self {
            sort_key: config.default_sort_key,
            sort_order: config.default_sort_order,
            rename_pattern: config.rename_pattern.clone(),
            config,
            config_path: None,
            forest: Vec::new(),
            root_name: None,
            selection_label: String::new(),
            entries: Vec::new(),
            expanded_paths: HashSet::new(),
            search_query: String::new(),
            is_ingesting: false,
            ingest_progress: ScanProgress::default(),
            status_message: "Ready.".to_string(),
            skipped_entries: 0,
            conflicts: 0,
            generation: 0,
            ingest_task: None,
            ingest_cancellation_flag: Arc::new(AtomicBool::new(false)),
            rename_target: None,
            last_export: None,
        }
    }

    /// Cancels any running ingestion and hands out a fresh generation number
    /// and cancellation flag for the next one.
    pub fn begin_ingestion(&mut self) -> (u64, Arc<AtomicBool>) {
        self.cancel_current_ingestion();

        self.generation += 1;
        let cancel_flag = Arc::new(AtomicBool::new(false));
        self.ingest_cancellation_flag = cancel_flag.clone();
        self.is_ingesting = true;
        self.ingest_progress = ScanProgress::default();
        self.status_message = "Reading selection...".to_string();
        (self.generation, cancel_flag)
    }

    /// Whether `generation` still belongs to the latest ingestion.
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Cancels the current ingestion task, if any.
    pub fn cancel_current_ingestion(&mut self) {
        self.ingest_cancellation_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.ingest_task.take() {
            tracing::info!("Aborting ingestion #{}", self.generation);
            handle.abort();
            self.status_message = "Cancelled.".to_string();
        }
        self.is_ingesting = false;
    }

    /// Replaces the tree with a freshly built one.
    pub fn load_forest(&mut self, selection: Selection, outcome: BuildOutcome) {
        self.selection_label = selection.label();
        self.root_name = selection.root_name;
        self.entries = selection.entries;
        self.skipped_entries = selection.skipped;
        self.conflicts = outcome.conflicts.len();
        self.forest = outcome.forest;

        self.expanded_paths = if self.config.expand_all_on_load {
            TreeQuery::collect_folder_paths(&self.forest).into_iter().collect()
        } else {
            HashSet::new()
        };

        self.is_ingesting = false;
        self.status_message = if self.forest.is_empty() {
            "No files or folders found".to_string()
        } else {
            let stats = TreeQuery::stats(&self.forest);
            format!("Loaded {} files in {} folders.", stats.total_files, stats.total_folders)
        };
    }

    /// Marks the running ingestion as failed, keeping the previous tree.
    pub fn fail_ingestion(&mut self, message: &str) {
        self.is_ingesting = false;
        self.status_message = format!("Reading the selection failed: {message}");
    }

    pub fn toggle_expand(&mut self, path: &str) {
        if !self.expanded_paths.remove(path) {
            self.expanded_paths.insert(path.to_string());
        }
    }

    pub fn expand_all(&mut self) {
        self.expanded_paths = TreeQuery::collect_folder_paths(&self.forest).into_iter().collect();
    }

    pub fn collapse_all(&mut self) {
        self.expanded_paths.clear();
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.search_query = query.to_string();
    }

    pub fn set_sort(&mut self, key: SortKey, order: SortOrder) {
        self.sort_key = key;
        self.sort_order = order;
    }

    /// The tree as displayed: filtered by the search query, then sorted.
    pub fn visible_forest(&self) -> Forest {
        let filtered = TreeQuery::filter(&self.forest, &self.search_query);
        TreeQuery::sort(&filtered, self.sort_key, self.sort_order)
    }

    /// Drops the current selection and everything derived from it.
    pub fn reset_selection(&mut self) {
        self.cancel_current_ingestion();
        self.forest.clear();
        self.root_name = None;
        self.selection_label.clear();
        self.entries.clear();
        self.expanded_paths.clear();
        self.search_query.clear();
        self.skipped_entries = 0;
        self.conflicts = 0;
        self.ingest_progress = ScanProgress::default();
        self.status_message = "Ready.".to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{build_selection, TreeNode};

    fn loaded_state(expand_all_on_load: bool) -> AppState {
        let config = AppConfig {
            expand_all_on_load,
            ..AppConfig::default()
        };
        let mut state = AppState::new(config);
        let selection = Selection {
            root_name: Some("proj".to_string()),
            entries: vec![
                IngestedEntry::new("proj/img/logo.png", "/p/img/logo.png", 1000, None),
                IngestedEntry::new("proj/img/icon.png", "/p/img/icon.png", 500, None),
                IngestedEntry::new("proj/readme.txt", "/p/readme.txt", 200, None),
            ],
            skipped: 1,
        };
        let outcome = build_selection(&selection, false);
        state.load_forest(selection, outcome);
        state
    }

    #[test]
    fn test_load_forest_expands_everything_by_default() {
        let state = loaded_state(true);
        assert_eq!(state.expanded_paths.len(), 2);
        assert!(state.expanded_paths.contains("proj/img"));
        assert_eq!(state.skipped_entries, 1);
        assert_eq!(state.selection_label, "proj");
        assert_eq!(state.status_message, "Loaded 3 files in 2 folders.");
    }

    #[test]
    fn test_load_forest_collapsed() {
        let state = loaded_state(false);
        assert!(state.expanded_paths.is_empty());
    }

    #[test]
    fn test_toggle_expand_and_bulk_changes() {
        let mut state = loaded_state(false);
        state.toggle_expand("proj");
        assert!(state.expanded_paths.contains("proj"));
        state.toggle_expand("proj");
        assert!(!state.expanded_paths.contains("proj"));

        state.expand_all();
        assert_eq!(state.expanded_paths.len(), 2);
        state.collapse_all();
        assert!(state.expanded_paths.is_empty());
    }

    #[test]
    fn test_visible_forest_filters_then_sorts() {
        let mut state = loaded_state(true);
        state.set_sort(SortKey::Size, SortOrder::Descending);
        let visible = state.visible_forest();
        let img = &visible[0].children()[0];
        let names: Vec<_> = img.children().iter().map(TreeNode::name).collect();
        assert_eq!(names, vec!["logo.png", "icon.png"]);

        state.set_search_query("icon");
        let visible = state.visible_forest();
        assert_eq!(TreeQuery::collect_leaf_paths(&visible), vec!["proj/img/icon.png".to_string()]);
        // The canonical tree is untouched.
        assert_eq!(TreeQuery::stats(&state.forest).total_files, 3);
    }

    #[test]
    fn test_begin_ingestion_bumps_generation() {
        let mut state = AppState::default();
        let (first, first_flag) = state.begin_ingestion();
        let (second, _) = state.begin_ingestion();
        assert_eq!(second, first + 1);
        assert!(first_flag.load(Ordering::SeqCst));
        assert!(!state.is_current(first));
        assert!(state.is_current(second));
        assert!(state.is_ingesting);
    }

    #[test]
    fn test_reset_selection() {
        let mut state = loaded_state(true);
        state.reset_selection();
        assert!(state.forest.is_empty());
        assert!(state.entries.is_empty());
        assert!(state.expanded_paths.is_empty());
        assert!(!state.is_ingesting);
    }
}
