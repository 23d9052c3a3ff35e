pub mod builder;
pub mod error;
pub mod export;
pub mod ignore;
pub mod ingest;
pub mod node;
pub mod path;
pub mod query;
pub mod rename;
pub mod render;

pub use builder::{build, build_selection, BuildOutcome, PathConflict, TreeBuilder};
pub use error::CoreError;
pub use export::{ExportFormat, ExportOptions};
pub use self::ignore::build_globset_from_patterns;
pub use ingest::{
    DirectoryWalker, FlatFile, FlatListSource, IngestContext, IngestedEntry, IngestionSource, PickedDirectory, ScanProgress,
    Selection,
};
pub use node::{Forest, TreeNode};
pub use query::{SortKey, SortOrder, TreeQuery, TreeStats};
pub use rename::{RenamePlan, RenameReport};
pub use render::{RenderOptions, TreeRenderer};
