//! Responsible for transforming the `AppState` into a `UiState` view model.
//!
//! This module acts as a presentation layer: it applies the search and sort
//! settings, decides which folders are open and flattens the result into the
//! rows a list view would draw.

use crate::core::path::parent_path;
use crate::core::{ScanProgress, SortKey, SortOrder, TreeNode, TreeQuery, TreeStats};
use crate::utils::{mime_type_for, FileCategory};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

use super::state::AppState;

/// A serializable representation of the application state for the UI.
#[derive(Serialize, Clone, Debug)]
pub struct UiState {
    pub selection_label: String,
    pub tree: Vec<UiNode>,
    pub rows: Vec<VisibleRow>,
    /// `true` when there is nothing to show, so the UI can say so.
    pub is_empty: bool,
    /// Statistics of the whole selection, independent of the search.
    pub stats: TreeStats,
    pub visible_files_count: usize,
    pub is_ingesting: bool,
    pub status_message: String,
    pub search_query: String,
    pub sort_key: SortKey,
    pub sort_order: SortOrder,
    pub ingest_progress: ScanProgress,
    pub skipped_entries: usize,
    pub conflicts: usize,
    pub rename_pattern: String,
    pub rename_target: Option<PathBuf>,
}

/// A serializable representation of a single node in the tree for the UI.
#[derive(Serialize, Clone, Debug)]
pub struct UiNode {
    pub name: String,
    pub path: String,
    pub is_folder: bool,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
    pub extension: String,
    /// File category and MIME type; `None` for folders.
    pub category: Option<FileCategory>,
    pub mime_type: Option<String>,
    pub is_expanded: bool,
    pub is_match: bool,
    pub children: Vec<UiNode>,
}

/// One line of the flattened tree.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct VisibleRow {
    pub depth: usize,
    pub name: String,
    pub path: String,
    pub is_folder: bool,
    pub is_expanded: bool,
    pub size: u64,
}

/// Creates the complete `UiState` from the current `AppState`.
pub fn generate_ui_state(state: &AppState) -> UiState {
    let visible = state.visible_forest();
    let expanded = effective_expanded_paths(state, &visible);
    let needle = search_needle(&state.search_query);
    let visible_stats = TreeQuery::stats(&visible);

    UiState {
        selection_label: state.selection_label.clone(),
        tree: build_ui_nodes(&visible, &expanded, needle.as_deref()),
        rows: visible_rows(&visible, &expanded),
        is_empty: visible.is_empty(),
        stats: TreeQuery::stats(&state.forest),
        visible_files_count: visible_stats.total_files,
        is_ingesting: state.is_ingesting,
        status_message: status_message(state),
        search_query: state.search_query.clone(),
        sort_key: state.sort_key,
        sort_order: state.sort_order,
        ingest_progress: state.ingest_progress.clone(),
        skipped_entries: state.skipped_entries,
        conflicts: state.conflicts,
        rename_pattern: state.rename_pattern.clone(),
        rename_target: state.rename_target.clone(),
    }
}

fn status_message(state: &AppState) -> String {
    if state.is_ingesting {
        format!(
            "Reading... {} files found, {} skipped ({})",
            state.ingest_progress.files_found, state.ingest_progress.entries_skipped, state.ingest_progress.current_path
        )
    } else {
        state.status_message.clone()
    }
}

fn search_needle(query: &str) -> Option<String> {
    let query = query.trim();
    (!query.is_empty()).then(|| query.to_lowercase())
}

/// The folders to draw open: the user's choice plus, while searching, every
/// ancestor of a match.
pub fn effective_expanded_paths(state: &AppState, visible: &[TreeNode]) -> HashSet<String> {
    let mut expanded = state.expanded_paths.clone();
    if let Some(needle) = search_needle(&state.search_query) {
        expanded.extend(auto_expand_for_matches(visible, &needle));
    }
    expanded
}

/// Ancestor folder paths of every node whose name contains `needle`.
pub fn auto_expand_for_matches(forest: &[TreeNode], needle: &str) -> HashSet<String> {
    let mut ancestors = HashSet::new();
    TreeQuery::walk(forest, &mut |node| {
        if node.name().to_lowercase().contains(needle) {
            let mut current = parent_path(node.path());
            while let Some(parent) = current {
                if !ancestors.insert(parent.to_string()) {
                    break;
                }
                current = parent_path(parent);
            }
        }
    });
    ancestors
}

fn build_ui_nodes(nodes: &[TreeNode], expanded: &HashSet<String>, needle: Option<&str>) -> Vec<UiNode> {
    nodes
        .iter()
        .map(|node| UiNode {
            name: node.name().to_string(),
            path: node.path().to_string(),
            is_folder: node.is_folder(),
            size: node.size(),
            modified_at: node.modified_at(),
            extension: node.extension(),
            category: (!node.is_folder()).then(|| FileCategory::from_extension(&node.extension())),
            mime_type: (!node.is_folder()).then(|| mime_type_for(node.name())),
            is_expanded: node.is_folder() && expanded.contains(node.path()),
            is_match: needle.is_some_and(|n| node.name().to_lowercase().contains(n)),
            children: build_ui_nodes(node.children(), expanded, needle),
        })
        .collect()
}

/// Flattens `forest` in order, descending only into expanded folders.
pub fn visible_rows(forest: &[TreeNode], expanded: &HashSet<String>) -> Vec<VisibleRow> {
    let mut rows = Vec::new();
    push_rows(forest, expanded, 0, &mut rows);
    rows
}

fn push_rows(nodes: &[TreeNode], expanded: &HashSet<String>, depth: usize, rows: &mut Vec<VisibleRow>) {
    for node in nodes {
        let is_expanded = node.is_folder() && expanded.contains(node.path());
        rows.push(VisibleRow {
            depth,
            name: node.name().to_string(),
            path: node.path().to_string(),
            is_folder: node.is_folder(),
            is_expanded,
            size: node.size(),
        });
        if is_expanded {
            push_rows(node.children(), expanded, depth + 1, rows);
        }
    }
}
