//! Defines the events sent from the application core to the front end.

use std::path::PathBuf;

use super::view_model::UiState;
use crate::core::{RenameReport, ScanProgress};

/// Events sent from the background tasks and command handlers to the UI.
#[derive(Debug)]
pub enum UserEvent {
    /// A complete state update to re-render the UI.
    StateUpdate(Box<UiState>),
    /// A progress update while a selection is being read.
    IngestProgress(ScanProgress),
    /// An error message to be displayed to the user.
    ShowError(String),
    /// The result of an export: the written file or the failure reason.
    ExportComplete(Result<PathBuf, String>),
    /// The result of a batch rename.
    RenameComplete(Result<RenameReport, String>),
    /// The result of a configuration export.
    ConfigExported(bool),
}
