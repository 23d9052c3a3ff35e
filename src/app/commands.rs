//! Contains all the command handlers the front end can invoke.
//!
//! Each handler works on the shared `AppState` and the `core` logic and
//! reports back through `UserEvent`s.

use super::events::UserEvent;
use super::helpers::{notify_state, with_state_and_notify};
use super::proxy::EventProxy;
use super::state::AppState;
use super::tasks::start_ingestion;
use crate::config::{self, AppConfig};
use crate::core::export::{self, ExportFormat, ExportOptions};
use crate::core::{DirectoryWalker, FlatListSource, PickedDirectory, RenamePlan, SortKey, SortOrder};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

/// Sends the current state, e.g. when a front end attaches.
pub fn initialize<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    let state_guard = state.lock().expect("Mutex was poisoned. This should not happen.");
    notify_state(&state_guard, &proxy);
}

/// Reads dropped folders and files, expanding directories level by level.
pub fn open_paths<P: EventProxy>(paths: Vec<PathBuf>, proxy: P, state: Arc<Mutex<AppState>>) {
    let walker = {
        let state_guard = state.lock().expect("Mutex was poisoned. This should not happen.");
        DirectoryWalker::new(paths)
            .with_follow_links(state_guard.config.follow_links)
            .with_ignore_patterns(state_guard.config.ignore_patterns.clone())
    };
    start_ingestion(Box::new(walker), proxy, state);
}

/// Reads a picked directory as one flat listing with relative paths.
///
/// The listing runs inside the ingestion task, so a later selection always
/// supersedes it.
pub fn open_directory<P: EventProxy>(root: PathBuf, proxy: P, state: Arc<Mutex<AppState>>) {
    let source = {
        let state_guard = state.lock().expect("Mutex was poisoned. This should not happen.");
        PickedDirectory::new(root)
            .with_follow_links(state_guard.config.follow_links)
            .with_ignore_patterns(state_guard.config.ignore_patterns.clone())
    };
    start_ingestion(Box::new(source), proxy, state);
}

/// Reads a manifest of relative paths (one per line) resolved against `base`.
pub fn open_manifest<P: EventProxy>(base: PathBuf, manifest: &str, proxy: P, state: Arc<Mutex<AppState>>) {
    let ignore_patterns = {
        let state_guard = state.lock().expect("Mutex was poisoned. This should not happen.");
        state_guard.config.ignore_patterns.clone()
    };
    let source = FlatListSource::from_manifest(&base, manifest).with_ignore_patterns(ignore_patterns);
    start_ingestion(Box::new(source), proxy, state);
}

/// Cancels the running ingestion, keeping the previous tree.
pub fn cancel_ingestion<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| s.cancel_current_ingestion());
}

/// Drops the current selection.
pub fn clear_selection<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| s.reset_selection());
}

/// Opens or closes one folder.
pub fn toggle_expansion<P: EventProxy>(path: &str, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| s.toggle_expand(path));
}

/// Opens or closes every folder.
pub fn expand_collapse_all<P: EventProxy>(expand: bool, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        if expand {
            s.expand_all();
        } else {
            s.collapse_all();
        }
    });
}

pub fn update_search<P: EventProxy>(query: &str, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| s.set_search_query(query));
}

pub fn update_sort<P: EventProxy>(key: SortKey, order: SortOrder, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| s.set_sort(key, order));
}

/// Selects `key`; selecting the active key again flips the order.
pub fn select_sort_key<P: EventProxy>(key: SortKey, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        let order = if s.sort_key == key {
            s.sort_order.toggled()
        } else {
            SortOrder::Ascending
        };
        s.set_sort(key, order);
    });
}

/// Replaces and persists the configuration.
pub fn update_config<P: EventProxy>(new_config: AppConfig, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| {
        s.config = new_config;
        if let Err(e) = config::settings::save_config(&s.config, s.config_path.as_deref()) {
            tracing::warn!("Failed to save config on update: {}", e);
        }
    });
}

/// Writes the visible tree as a report into `output_dir` (or the configured export directory).
pub async fn export_tree<P: EventProxy>(
    format: ExportFormat,
    output_dir: Option<PathBuf>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let (forest, options, dir, basename) = {
        let state_guard = state.lock().expect("Mutex was poisoned. This should not happen.");
        let config = &state_guard.config;
        let options = ExportOptions {
            include_metadata: config.export_include_metadata,
            include_stats: config.export_include_stats,
            project_name: if state_guard.selection_label.is_empty() {
                ExportOptions::default().project_name
            } else {
                state_guard.selection_label.clone()
            },
            generated_at: Utc::now(),
        };
        (
            state_guard.visible_forest(),
            options,
            output_dir.unwrap_or_else(|| config.resolved_export_directory()),
            config.export_basename.clone(),
        )
    };

    let result = export::write_export(&dir, &basename, format, &forest, &options).await;
    match result {
        Ok(path) => {
            with_state_and_notify(&state, &proxy, |s| {
                s.last_export = Some(path.clone());
                s.status_message = format!("Exported to {}", path.display());
            });
            proxy.send_event(UserEvent::ExportComplete(Ok(path)));
        }
        Err(e) => {
            tracing::error!("Export failed: {}", e);
            proxy.send_event(UserEvent::ExportComplete(Err(e.to_string())));
        }
    }
}

pub fn set_rename_pattern<P: EventProxy>(pattern: &str, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| s.rename_pattern = pattern.to_string());
}

pub fn set_rename_target<P: EventProxy>(target: Option<PathBuf>, proxy: P, state: Arc<Mutex<AppState>>) {
    with_state_and_notify(&state, &proxy, |s| s.rename_target = target);
}

/// The renames the current selection and pattern would produce.
pub fn rename_preview(state: &Arc<Mutex<AppState>>) -> RenamePlan {
    let state_guard = state.lock().expect("Mutex was poisoned. This should not happen.");
    RenamePlan::from_entries(&state_guard.entries, &state_guard.rename_pattern)
}

/// Copies the selection's files into the rename target under their new names.
pub async fn apply_rename<P: EventProxy>(proxy: P, state: Arc<Mutex<AppState>>) {
    let plan = rename_preview(&state);
    let target = {
        let state_guard = state.lock().expect("Mutex was poisoned. This should not happen.");
        state_guard.rename_target.clone()
    };

    let Some(target) = target else {
        proxy.send_event(UserEvent::RenameComplete(Err(
            "Select a target directory before renaming.".to_string(),
        )));
        return;
    };

    let cancel_flag = AtomicBool::new(false);
    match plan.apply(&target, &cancel_flag).await {
        Ok(report) => {
            with_state_and_notify(&state, &proxy, |s| {
                s.status_message = format!("Renamed {} files into {}", report.written.len(), target.display());
            });
            proxy.send_event(UserEvent::RenameComplete(Ok(report)));
        }
        Err(e) => {
            tracing::error!("Rename failed: {}", e);
            proxy.send_event(UserEvent::RenameComplete(Err(e.to_string())));
        }
    }
}

/// Writes the current configuration to `path`.
pub fn export_config<P: EventProxy>(path: &Path, proxy: P, state: Arc<Mutex<AppState>>) {
    let state_guard = state.lock().expect("Mutex was poisoned. This should not happen.");
    let result = config::settings::export_config(&state_guard.config, path);
    if let Err(e) = &result {
        tracing::error!("Failed to export config: {}", e);
    }
    proxy.send_event(UserEvent::ConfigExported(result.is_ok()));
}

/// Replaces the configuration with one read from `path`.
pub fn import_config<P: EventProxy>(path: &Path, proxy: P, state: Arc<Mutex<AppState>>) {
    match config::settings::import_config(path) {
        Ok(new_config) => update_config(new_config, proxy, state),
        Err(e) => proxy.send_event(UserEvent::ShowError(format!("Failed to import config: {e}"))),
    }
}
