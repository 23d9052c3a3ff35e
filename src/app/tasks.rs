//! Background ingestion of a selection.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use super::events::UserEvent;
use super::helpers::notify_state;
use super::proxy::EventProxy;
use super::state::AppState;
use crate::core::{build_selection, CoreError, IngestContext, IngestionSource, ScanProgress};

/// Starts reading `source` in the background and publishes the built tree.
///
/// Any ingestion still running is cancelled first. The new one gets its own
/// generation number; a result that arrives after a newer ingestion started
/// is discarded.
pub fn start_ingestion<P: EventProxy>(source: Box<dyn IngestionSource>, proxy: P, state: Arc<Mutex<AppState>>) {
    let mut state_guard = state.lock().expect("Mutex was poisoned. This should not happen.");
    let (generation, cancel_flag) = state_guard.begin_ingestion();
    tracing::info!("Starting ingestion #{} of {}", generation, source.describe());

    let task_proxy = proxy.clone();
    let task_state = state.clone();
    let handle = tokio::spawn(async move {
        run_ingestion(source, generation, cancel_flag, task_proxy, task_state).await;
    });
    state_guard.ingest_task = Some(handle);

    notify_state(&state_guard, &proxy);
}

/// Reads `source`, builds the tree and stores it if `generation` is still current.
pub async fn run_ingestion<P: EventProxy>(
    source: Box<dyn IngestionSource>,
    generation: u64,
    cancel_flag: Arc<AtomicBool>,
    proxy: P,
    state: Arc<Mutex<AppState>>,
) {
    let (progress_interval, keep_empty_root) = {
        let state_guard = state.lock().expect("Mutex was poisoned. This should not happen.");
        (state_guard.config.progress_interval, state_guard.config.keep_empty_root)
    };

    let progress_proxy = proxy.clone();
    let progress_state = state.clone();
    let ctx = IngestContext::new(cancel_flag.clone())
        .with_progress_interval(progress_interval)
        .with_progress(move |progress: ScanProgress| {
            let Ok(mut state_guard) = progress_state.lock() else {
                return;
            };
            if !state_guard.is_current(generation) {
                return;
            }
            state_guard.ingest_progress = progress.clone();
            drop(state_guard);
            progress_proxy.send_event(UserEvent::IngestProgress(progress));
        });

    let result = source.ingest(&ctx).await;
    // Building is pure, so it happens before taking the lock.
    let built = result.map(|selection| {
        let outcome = build_selection(&selection, keep_empty_root);
        (selection, outcome)
    });

    let mut state_guard = state.lock().expect("Mutex was poisoned. This should not happen.");
    if !state_guard.is_current(generation) {
        tracing::warn!(
            "Discarding result of ingestion #{}; #{} is newer",
            generation,
            state_guard.generation
        );
        return;
    }
    // Cancelled after the source finished but before the lock was taken.
    let built = if cancel_flag.load(Ordering::SeqCst) {
        Err(CoreError::Cancelled)
    } else {
        built
    };

    match built {
        Ok((selection, outcome)) => {
            tracing::info!(
                "Ingestion #{} finished: {} entries, {} skipped, {} conflicts",
                generation,
                selection.entries.len(),
                selection.skipped,
                outcome.conflicts.len()
            );
            state_guard.load_forest(selection, outcome);
        }
        Err(CoreError::Cancelled) => {
            tracing::info!("Ingestion #{} was cancelled", generation);
            state_guard.is_ingesting = false;
            state_guard.status_message = "Cancelled.".to_string();
        }
        Err(e) => {
            tracing::error!("Ingestion #{} failed: {}", generation, e);
            state_guard.fail_ingestion(&e.to_string());
            proxy.send_event(UserEvent::ShowError(e.to_string()));
        }
    }

    state_guard.ingest_task = None;
    notify_state(&state_guard, &proxy);
}
