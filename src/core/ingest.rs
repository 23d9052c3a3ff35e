//! Turns a user selection into a flat list of leaf-file records.
//!
//! Two protocols feed the tree builder:
//!
//! * [`FlatListSource`] mirrors a directory picker: every file arrives with its
//!   relative path already spelled out.
//! * [`DirectoryWalker`] mirrors a drag-and-drop of folders and files: only the
//!   dropped top-level paths are known, and the walker expands directories one
//!   level at a time to reconstruct the same relative paths.
//!
//! Both protocols use one root convention: the selected (or dropped) folder's
//! own name is always the first segment of every relative path beneath it. A
//! selected folder `proj` therefore always becomes a single root folder
//! `proj`, whichever protocol produced it. Dropped loose files have
//! single-segment paths and end up as root-level files.

use super::error::CoreError;
use super::ignore::{build_globset_from_patterns, is_ignored};
use super::path::{join_path, PathSegments};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use globset::GlobSet;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::Metadata;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

const DEFAULT_PROGRESS_INTERVAL: usize = 25;

/// One leaf file of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedEntry {
    /// Slash-joined path from the selection root, including the root folder name.
    pub relative_path: String,
    /// Where the file lives on disk.
    pub handle: PathBuf,
    pub size: u64,
    pub modified_at: Option<DateTime<Utc>>,
}

impl IngestedEntry {
    pub fn new(
        relative_path: impl Into<String>,
        handle: impl Into<PathBuf>,
        size: u64,
        modified_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            relative_path: relative_path.into(),
            handle: handle.into(),
            size,
            modified_at,
        }
    }

    /// The leaf name of the relative path.
    pub fn name(&self) -> &str {
        self.relative_path
            .rsplit(['/', '\\'])
            .find(|segment| !segment.is_empty())
            .unwrap_or(&self.relative_path)
    }
}

/// The outcome of one ingestion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    /// The selected folder's name when the selection is exactly one folder.
    pub root_name: Option<String>,
    /// One record per leaf file, in discovery order.
    pub entries: Vec<IngestedEntry>,
    /// Entries that could not be read and were left out.
    pub skipped: usize,
}

impl Selection {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// A label for the selection: the root folder name, or a generic one for loose drops.
    pub fn label(&self) -> String {
        match (&self.root_name, self.entries.as_slice()) {
            (Some(name), _) => name.clone(),
            (None, [single]) => single.name().to_string(),
            (None, _) => "Dropped Files".to_string(),
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct ScanProgress {
    pub files_found: usize,
    pub entries_skipped: usize,
    pub current_path: String,
}

pub type ProgressCallback = Arc<dyn Fn(ScanProgress) + Send + Sync>;

/// Cancellation and progress plumbing handed to every ingestion.
#[derive(Clone)]
pub struct IngestContext {
    pub cancel_flag: Arc<AtomicBool>,
    progress: ProgressCallback,
    progress_interval: usize,
}

impl IngestContext {
    pub fn new(cancel_flag: Arc<AtomicBool>) -> Self {
        Self {
            cancel_flag,
            progress: Arc::new(|_| {}),
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
        }
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(ScanProgress) + Send + Sync + 'static,
    {
        self.progress = Arc::new(callback);
        self
    }

    pub fn with_progress_interval(mut self, interval: usize) -> Self {
        self.progress_interval = interval.max(1);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_flag.load(Ordering::Relaxed)
    }

    fn check_cancelled(&self) -> Result<(), CoreError> {
        if self.is_cancelled() {
            Err(CoreError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn report(&self, files_found: usize, entries_skipped: usize, current_path: impl Into<String>) {
        (self.progress)(ScanProgress {
            files_found,
            entries_skipped,
            current_path: current_path.into(),
        });
    }
}

impl Default for IngestContext {
    fn default() -> Self {
        Self::new(Arc::new(AtomicBool::new(false)))
    }
}

/// A source of leaf-file records. Implementations never emit directories and
/// skip unreadable entries instead of failing the whole selection.
#[async_trait]
pub trait IngestionSource: Send + Sync {
    async fn ingest(&self, ctx: &IngestContext) -> Result<Selection, CoreError>;

    /// A short human-readable description used in logs.
    fn describe(&self) -> String;
}

fn modified_time(metadata: &Metadata) -> Option<DateTime<Utc>> {
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

/// Returns the last component of `path` as a string, resolving `.` and `..` first.
fn entry_name(path: &Path) -> Option<String> {
    if let Some(name) = path.file_name() {
        return Some(name.to_string_lossy().into_owned());
    }
    std::fs::canonicalize(path)
        .ok()?
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
}

// ---------------------------------------------------------------------------
// Flat-list protocol
// ---------------------------------------------------------------------------

/// A file record as a directory picker reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatFile {
    pub relative_path: String,
    pub handle: PathBuf,
    /// Filled in by the picker when known; otherwise read from `handle`.
    pub size: Option<u64>,
    pub modified_at: Option<DateTime<Utc>>,
}

impl FlatFile {
    pub fn new(relative_path: impl Into<String>, handle: impl Into<PathBuf>) -> Self {
        Self {
            relative_path: relative_path.into(),
            handle: handle.into(),
            size: None,
            modified_at: None,
        }
    }

    pub fn with_metadata(mut self, size: u64, modified_at: Option<DateTime<Utc>>) -> Self {
        self.size = Some(size);
        self.modified_at = modified_at;
        self
    }
}

enum Resolved {
    Entry(IngestedEntry),
    Ignored,
    Skipped,
}

/// The picker protocol: a flat list of files whose relative paths already
/// start with the selected folder's name.
#[derive(Debug, Clone, Default)]
pub struct FlatListSource {
    files: Vec<FlatFile>,
    ignore_patterns: HashSet<String>,
    listing_errors: usize,
    /// The listed folder's name, known even when it holds no files.
    root_name: Option<String>,
}

impl FlatListSource {
    pub fn new(files: Vec<FlatFile>) -> Self {
        Self {
            files,
            ..Default::default()
        }
    }

    pub fn with_ignore_patterns(mut self, patterns: HashSet<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Flattens `root` the way a directory picker does, prefixing every
    /// relative path with the root folder's own name.
    ///
    /// This performs blocking I/O; call it from `spawn_blocking` inside async code.
    pub fn from_directory(root: &Path, follow_links: bool) -> Result<Self, CoreError> {
        Self::list_directory(root, follow_links, &AtomicBool::new(false))
    }

    /// Like [`from_directory`](Self::from_directory), stopping with
    /// `CoreError::Cancelled` once `cancel_flag` is set.
    fn list_directory(root: &Path, follow_links: bool, cancel_flag: &AtomicBool) -> Result<Self, CoreError> {
        if !root.is_dir() {
            return Err(CoreError::NotADirectory(root.to_path_buf()));
        }
        let root_name =
            entry_name(root).ok_or_else(|| CoreError::NotADirectory(root.to_path_buf()))?;

        let mut files = Vec::new();
        let mut listing_errors = 0;

        let walker = ::ignore::WalkBuilder::new(root)
            .standard_filters(false)
            .follow_links(follow_links)
            .build();

        for entry in walker {
            if cancel_flag.load(Ordering::Relaxed) {
                return Err(CoreError::Cancelled);
            }
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry below {:?}: {}", root, e);
                    listing_errors += 1;
                    continue;
                }
            };
            if !entry.file_type().is_some_and(|ft| ft.is_file()) {
                continue;
            }

            let inner = entry.path().strip_prefix(root)?;
            let relative_path = inner
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .fold(root_name.clone(), |acc, segment| join_path(&acc, &segment));

            let mut file = FlatFile::new(relative_path, entry.path());
            if let Ok(metadata) = entry.metadata() {
                file = file.with_metadata(metadata.len(), modified_time(&metadata));
            }
            files.push(file);
        }

        tracing::info!(
            "Listed {} files below {:?} ({} unreadable entries)",
            files.len(),
            root,
            listing_errors
        );

        Ok(Self {
            files,
            ignore_patterns: HashSet::new(),
            listing_errors,
            root_name: Some(root_name),
        })
    }

    /// Reads a manifest with one relative path per line. Handles resolve
    /// against `base`; blank lines and `#` comments are skipped.
    pub fn from_manifest(base: &Path, manifest: &str) -> Self {
        let files = manifest
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let segments = PathSegments::parse(line)?;
                let handle = segments.iter().fold(base.to_path_buf(), |acc, s| acc.join(s));
                Some(FlatFile::new(segments.joined(), handle))
            })
            .collect();
        Self::new(files)
    }

    fn resolve(file: FlatFile, ignore_set: &GlobSet, cancel_flag: &AtomicBool) -> Resolved {
        if cancel_flag.load(Ordering::Relaxed) {
            return Resolved::Skipped;
        }
        if is_ignored(ignore_set, &file.relative_path) {
            return Resolved::Ignored;
        }

        let (size, modified_at) = match file.size {
            Some(size) => (size, file.modified_at),
            None => match std::fs::metadata(&file.handle) {
                Ok(metadata) if metadata.is_file() => (metadata.len(), modified_time(&metadata)),
                Ok(_) => {
                    tracing::warn!("Skipping {:?}: not a regular file", file.handle);
                    return Resolved::Skipped;
                }
                Err(e) => {
                    tracing::warn!("Skipping unreadable file {:?}: {}", file.handle, e);
                    return Resolved::Skipped;
                }
            },
        };

        Resolved::Entry(IngestedEntry {
            relative_path: file.relative_path,
            handle: file.handle,
            size,
            modified_at,
        })
    }
}

#[async_trait]
impl IngestionSource for FlatListSource {
    async fn ingest(&self, ctx: &IngestContext) -> Result<Selection, CoreError> {
        ctx.check_cancelled()?;
        ctx.report(0, 0, format!("Reading {} listed files...", self.files.len()));

        let files = self.files.clone();
        let ignore_set = build_globset_from_patterns(&self.ignore_patterns);
        let cancel_flag = ctx.cancel_flag.clone();
        let resolved_count = Arc::new(AtomicUsize::new(0));
        let counter = resolved_count.clone();
        let progress_ctx = ctx.clone();

        // Stat calls are blocking; resolve them in parallel off the async runtime.
        let resolved: Vec<Resolved> = tokio::task::spawn_blocking(move || {
            files
                .into_par_iter()
                .map(|file| {
                    let outcome = Self::resolve(file, &ignore_set, &cancel_flag);
                    let done = counter.fetch_add(1, Ordering::Relaxed) + 1;
                    if done % progress_ctx.progress_interval == 0 {
                        progress_ctx.report(done, 0, format!("Resolved {done} files..."));
                    }
                    outcome
                })
                .collect()
        })
        .await?;

        ctx.check_cancelled()?;

        let mut entries = Vec::with_capacity(resolved.len());
        let mut skipped = self.listing_errors;
        let mut ignored = 0;
        for outcome in resolved {
            match outcome {
                Resolved::Entry(entry) => entries.push(entry),
                Resolved::Ignored => ignored += 1,
                Resolved::Skipped => skipped += 1,
            }
        }

        let root_name = self.root_name.clone().or_else(|| common_root_folder(&entries));

        tracing::info!(
            "Flat list ingested: {} files, {} skipped, {} ignored",
            entries.len(),
            skipped,
            ignored
        );
        ctx.report(
            entries.len(),
            skipped,
            format!("Ingestion complete! {} files found", entries.len()),
        );

        Ok(Selection {
            root_name,
            entries,
            skipped,
        })
    }

    fn describe(&self) -> String {
        format!("flat list of {} files", self.files.len())
    }
}

/// The shared first segment of all entries, if every entry lives below it.
fn common_root_folder(entries: &[IngestedEntry]) -> Option<String> {
    let mut root: Option<String> = None;
    for entry in entries {
        let segments = PathSegments::parse(&entry.relative_path)?;
        if segments.len() < 2 {
            return None;
        }
        let first = segments.prefix(1);
        match &root {
            Some(existing) if *existing != first => return None,
            Some(_) => {}
            None => root = Some(first),
        }
    }
    root
}

/// A directory chosen through the picker. The listing itself happens inside
/// `ingest`, so it runs under the ingestion's generation and cancel flag.
#[derive(Debug, Clone, Default)]
pub struct PickedDirectory {
    root: PathBuf,
    follow_links: bool,
    ignore_patterns: HashSet<String>,
}

impl PickedDirectory {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Default::default()
        }
    }

    pub fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: HashSet<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }
}

#[async_trait]
impl IngestionSource for PickedDirectory {
    async fn ingest(&self, ctx: &IngestContext) -> Result<Selection, CoreError> {
        ctx.check_cancelled()?;
        ctx.report(0, 0, format!("Listing {}...", self.root.display()));

        let root = self.root.clone();
        let follow_links = self.follow_links;
        let cancel_flag = ctx.cancel_flag.clone();
        let listing = tokio::task::spawn_blocking(move || {
            FlatListSource::list_directory(&root, follow_links, &cancel_flag)
        })
        .await??;

        listing
            .with_ignore_patterns(self.ignore_patterns.clone())
            .ingest(ctx)
            .await
    }

    fn describe(&self) -> String {
        format!("picked directory {:?}", self.root)
    }
}

// ---------------------------------------------------------------------------
// Recursive-walk protocol
// ---------------------------------------------------------------------------

/// The drag-and-drop protocol: a handful of dropped files and folders that
/// are expanded asynchronously, one directory level at a time.
#[derive(Debug, Clone, Default)]
pub struct DirectoryWalker {
    roots: Vec<PathBuf>,
    follow_links: bool,
    ignore_patterns: HashSet<String>,
}

#[derive(Default)]
struct WalkAccumulator {
    entries: Vec<IngestedEntry>,
    skipped: usize,
}

impl WalkAccumulator {
    fn push_file(&mut self, relative_path: String, handle: PathBuf, metadata: &Metadata, ctx: &IngestContext) {
        tracing::debug!("Found file {}", relative_path);
        self.entries.push(IngestedEntry {
            relative_path,
            handle,
            size: metadata.len(),
            modified_at: modified_time(metadata),
        });
        if self.entries.len() % ctx.progress_interval == 0 {
            let current = self
                .entries
                .last()
                .map(|e| e.relative_path.clone())
                .unwrap_or_default();
            ctx.report(self.entries.len(), self.skipped, current);
        }
    }
}

type WalkFuture<'a> = Pin<Box<dyn Future<Output = Result<(), CoreError>> + Send + 'a>>;

impl DirectoryWalker {
    pub fn new(roots: Vec<PathBuf>) -> Self {
        Self {
            roots,
            ..Default::default()
        }
    }

    pub fn with_follow_links(mut self, follow_links: bool) -> Self {
        self.follow_links = follow_links;
        self
    }

    pub fn with_ignore_patterns(mut self, patterns: HashSet<String>) -> Self {
        self.ignore_patterns = patterns;
        self
    }

    /// Stats `path`, returning `None` for symlinks that should not be followed.
    async fn classify(&self, path: &Path) -> std::io::Result<Option<Metadata>> {
        if self.follow_links {
            return tokio::fs::metadata(path).await.map(Some);
        }
        let metadata = tokio::fs::symlink_metadata(path).await?;
        if metadata.file_type().is_symlink() {
            tracing::debug!("Not following symlink {:?}", path);
            Ok(None)
        } else {
            Ok(Some(metadata))
        }
    }

    /// Reads every entry of `dir` first, records its files, then descends
    /// into its subdirectories one after another.
    fn walk_directory<'a>(
        &'a self,
        dir: PathBuf,
        relative: String,
        ctx: &'a IngestContext,
        ignore_set: &'a GlobSet,
        acc: &'a mut WalkAccumulator,
    ) -> WalkFuture<'a> {
        Box::pin(async move {
            ctx.check_cancelled()?;

            let mut reader = match tokio::fs::read_dir(&dir).await {
                Ok(reader) => reader,
                Err(e) => {
                    tracing::warn!("Skipping unreadable directory {:?}: {}", dir, e);
                    acc.skipped += 1;
                    return Ok(());
                }
            };

            let mut children = Vec::new();
            loop {
                match reader.next_entry().await {
                    Ok(Some(entry)) => children.push(entry),
                    Ok(None) => break,
                    Err(e) => {
                        tracing::warn!("Stopped reading {:?} early: {}", dir, e);
                        acc.skipped += 1;
                        break;
                    }
                }
            }

            let mut subdirectories = Vec::new();
            for child in children {
                ctx.check_cancelled()?;

                let name = child.file_name().to_string_lossy().into_owned();
                let child_relative = join_path(&relative, &name);
                if is_ignored(ignore_set, &child_relative) {
                    tracing::debug!("Ignoring {}", child_relative);
                    continue;
                }

                let path = child.path();
                match self.classify(&path).await {
                    Ok(Some(metadata)) if metadata.is_dir() => {
                        subdirectories.push((path, child_relative));
                    }
                    Ok(Some(metadata)) if metadata.is_file() => {
                        acc.push_file(child_relative, path, &metadata, ctx);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("Skipping unreadable entry {:?}: {}", path, e);
                        acc.skipped += 1;
                    }
                }
            }

            for (path, child_relative) in subdirectories {
                self.walk_directory(path, child_relative, ctx, ignore_set, acc)
                    .await?;
            }

            tokio::task::yield_now().await;
            Ok(())
        })
    }
}

#[async_trait]
impl IngestionSource for DirectoryWalker {
    async fn ingest(&self, ctx: &IngestContext) -> Result<Selection, CoreError> {
        ctx.check_cancelled()?;
        ctx.report(0, 0, "Starting walk...");

        let ignore_set = build_globset_from_patterns(&self.ignore_patterns);
        let mut acc = WalkAccumulator::default();
        let mut dropped_folders = Vec::new();

        for root in &self.roots {
            ctx.check_cancelled()?;

            let Some(name) = entry_name(root) else {
                tracing::warn!("Skipping dropped entry without a name: {:?}", root);
                acc.skipped += 1;
                continue;
            };
            if is_ignored(&ignore_set, &name) {
                continue;
            }

            match self.classify(root).await {
                Ok(Some(metadata)) if metadata.is_dir() => {
                    dropped_folders.push(name.clone());
                    self.walk_directory(root.clone(), name, ctx, &ignore_set, &mut acc)
                        .await?;
                }
                Ok(Some(metadata)) if metadata.is_file() => {
                    acc.push_file(name, root.clone(), &metadata, ctx);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Skipping unreadable dropped entry {:?}: {}", root, e);
                    acc.skipped += 1;
                }
            }
        }

        ctx.check_cancelled()?;

        let root_name = match (self.roots.len(), dropped_folders.as_slice()) {
            (1, [single]) => Some(single.clone()),
            _ => None,
        };

        tracing::info!(
            "Walk completed: {} files found, {} entries skipped",
            acc.entries.len(),
            acc.skipped
        );
        ctx.report(
            acc.entries.len(),
            acc.skipped,
            format!("Ingestion complete! {} files found", acc.entries.len()),
        );

        Ok(Selection {
            root_name,
            entries: acc.entries,
            skipped: acc.skipped,
        })
    }

    fn describe(&self) -> String {
        format!("walk of {} dropped entries", self.roots.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn create_file(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    fn project() -> (TempDir, PathBuf) {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("proj");
        create_file(&root, "img/logo.png", "0123456789");
        create_file(&root, "img/icon.png", "01234");
        create_file(&root, "readme.txt", "hi");
        create_file(&root, "docs/deep/nested/notes.md", "notes");
        (temp, root)
    }

    fn sorted_paths(selection: &Selection) -> Vec<String> {
        let mut paths: Vec<_> = selection
            .entries
            .iter()
            .map(|e| e.relative_path.clone())
            .collect();
        paths.sort();
        paths
    }

    #[tokio::test]
    async fn test_walker_prefixes_paths_with_dropped_folder_name() {
        let (_temp, root) = project();
        let selection = DirectoryWalker::new(vec![root])
            .ingest(&IngestContext::default())
            .await
            .unwrap();

        assert_eq!(selection.root_name.as_deref(), Some("proj"));
        assert_eq!(selection.skipped, 0);
        assert_eq!(
            sorted_paths(&selection),
            vec![
                "proj/docs/deep/nested/notes.md",
                "proj/img/icon.png",
                "proj/img/logo.png",
                "proj/readme.txt",
            ]
        );
        let logo = selection
            .entries
            .iter()
            .find(|e| e.relative_path == "proj/img/logo.png")
            .unwrap();
        assert_eq!(logo.size, 10);
        assert!(logo.modified_at.is_some());
    }

    #[tokio::test]
    async fn test_walker_reads_a_level_before_descending() {
        let (_temp, root) = project();
        let selection = DirectoryWalker::new(vec![root])
            .ingest(&IngestContext::default())
            .await
            .unwrap();

        let readme = selection
            .entries
            .iter()
            .position(|e| e.relative_path == "proj/readme.txt")
            .unwrap();
        let deepest = selection
            .entries
            .iter()
            .position(|e| e.relative_path == "proj/docs/deep/nested/notes.md")
            .unwrap();
        assert!(readme < deepest, "top-level files come before nested ones");
    }

    #[tokio::test]
    async fn test_flat_list_and_walker_converge() {
        let (_temp, root) = project();
        let walked = DirectoryWalker::new(vec![root.clone()])
            .ingest(&IngestContext::default())
            .await
            .unwrap();
        let listed = FlatListSource::from_directory(&root, false)
            .unwrap()
            .ingest(&IngestContext::default())
            .await
            .unwrap();

        assert_eq!(sorted_paths(&walked), sorted_paths(&listed));
        assert_eq!(walked.root_name, listed.root_name);
    }

    #[tokio::test]
    async fn test_dropped_loose_files_are_single_segment() {
        let temp = tempfile::tempdir().unwrap();
        create_file(temp.path(), "a.txt", "a");
        create_file(temp.path(), "b.txt", "bb");

        let selection = DirectoryWalker::new(vec![temp.path().join("a.txt"), temp.path().join("b.txt")])
            .ingest(&IngestContext::default())
            .await
            .unwrap();

        assert_eq!(selection.root_name, None);
        assert_eq!(sorted_paths(&selection), vec!["a.txt", "b.txt"]);
        assert_eq!(selection.label(), "Dropped Files");
    }

    #[tokio::test]
    async fn test_missing_dropped_entry_is_skipped_not_fatal() {
        let (_temp, root) = project();
        let missing = root.join("does-not-exist");
        let selection = DirectoryWalker::new(vec![missing, root.join("readme.txt")])
            .ingest(&IngestContext::default())
            .await
            .unwrap();

        assert_eq!(selection.skipped, 1);
        assert_eq!(sorted_paths(&selection), vec!["readme.txt"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_directory_is_skipped() {
        use std::os::unix::fs::PermissionsExt;
        if crate::utils::test_helpers::running_as_root() {
            return;
        }

        let (_temp, root) = project();
        let locked = root.join("docs");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        let selection = DirectoryWalker::new(vec![root.clone()])
            .ingest(&IngestContext::default())
            .await
            .unwrap();

        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert_eq!(selection.skipped, 1);
        assert_eq!(selection.entries.len(), 3);
    }

    #[tokio::test]
    async fn test_ignore_patterns_apply_to_walker() {
        let (_temp, root) = project();
        create_file(&root, "node_modules/pkg/index.js", "x");
        create_file(&root, "debug.log", "x");

        let patterns: HashSet<String> = ["node_modules/", "*.log"].iter().map(|s| s.to_string()).collect();
        let selection = DirectoryWalker::new(vec![root])
            .with_ignore_patterns(patterns)
            .ingest(&IngestContext::default())
            .await
            .unwrap();

        assert!(selection
            .entries
            .iter()
            .all(|e| !e.relative_path.contains("node_modules") && !e.relative_path.ends_with(".log")));
        assert_eq!(selection.entries.len(), 4);
    }

    #[tokio::test]
    async fn test_cancelled_walk_returns_cancelled() {
        let (_temp, root) = project();
        let ctx = IngestContext::new(Arc::new(AtomicBool::new(true)));
        let result = DirectoryWalker::new(vec![root]).ingest(&ctx).await;
        assert!(matches!(result, Err(CoreError::Cancelled)));
    }

    #[tokio::test]
    async fn test_empty_directory_yields_empty_selection() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("empty");
        fs::create_dir_all(&root).unwrap();

        let selection = DirectoryWalker::new(vec![root])
            .ingest(&IngestContext::default())
            .await
            .unwrap();

        assert!(selection.is_empty());
        assert_eq!(selection.root_name.as_deref(), Some("empty"));
    }

    #[tokio::test]
    async fn test_picked_empty_directory_keeps_root_name() {
        let temp = tempfile::tempdir().unwrap();
        let root = temp.path().join("empty");
        fs::create_dir_all(&root).unwrap();

        let picked = PickedDirectory::new(&root)
            .ingest(&IngestContext::default())
            .await
            .unwrap();
        let walked = DirectoryWalker::new(vec![root])
            .ingest(&IngestContext::default())
            .await
            .unwrap();

        assert!(picked.is_empty());
        assert_eq!(picked.root_name.as_deref(), Some("empty"));
        assert_eq!(picked.root_name, walked.root_name);
    }

    #[tokio::test]
    async fn test_picked_directory_matches_walker() {
        let (_temp, root) = project();
        let picked = PickedDirectory::new(&root)
            .with_ignore_patterns(HashSet::from(["*.md".to_string()]))
            .ingest(&IngestContext::default())
            .await
            .unwrap();

        assert_eq!(
            sorted_paths(&picked),
            vec!["proj/img/icon.png", "proj/img/logo.png", "proj/readme.txt"]
        );
        assert_eq!(picked.root_name.as_deref(), Some("proj"));
    }

    #[tokio::test]
    async fn test_picked_missing_directory_fails() {
        let temp = tempfile::tempdir().unwrap();
        let result = PickedDirectory::new(temp.path().join("nope"))
            .ingest(&IngestContext::default())
            .await;
        assert!(matches!(result, Err(CoreError::NotADirectory(_))));
    }

    #[test]
    fn test_listing_stops_when_cancelled() {
        let (_temp, root) = project();
        let result = FlatListSource::list_directory(&root, false, &AtomicBool::new(true));
        assert!(matches!(result, Err(CoreError::Cancelled)));
    }

    #[tokio::test]
    async fn test_manifest_skips_missing_files() {
        let (temp, _root) = project();
        let manifest = "# selection\nproj/readme.txt\n\nproj//img/logo.png\nproj/missing.bin\n";
        let selection = FlatListSource::from_manifest(temp.path(), manifest)
            .ingest(&IngestContext::default())
            .await
            .unwrap();

        assert_eq!(sorted_paths(&selection), vec!["proj/img/logo.png", "proj/readme.txt"]);
        assert_eq!(selection.skipped, 1);
        assert_eq!(selection.root_name.as_deref(), Some("proj"));
    }

    #[tokio::test]
    async fn test_flat_list_keeps_supplied_metadata() {
        let files = vec![
            FlatFile::new("proj/a.txt", "/nowhere/a.txt").with_metadata(42, None),
            FlatFile::new("other/b.txt", "/nowhere/b.txt").with_metadata(7, None),
        ];
        let selection = FlatListSource::new(files)
            .ingest(&IngestContext::default())
            .await
            .unwrap();

        assert_eq!(selection.entries.len(), 2);
        assert_eq!(selection.entries[0].size, 42);
        assert_eq!(selection.root_name, None, "two different top-level folders");
    }

    #[tokio::test]
    async fn test_progress_is_reported() {
        let (_temp, root) = project();
        let reports = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = reports.clone();
        let ctx = IngestContext::default()
            .with_progress_interval(1)
            .with_progress(move |p| sink.lock().unwrap().push(p));

        DirectoryWalker::new(vec![root]).ingest(&ctx).await.unwrap();

        let reports = reports.lock().unwrap();
        assert!(reports.len() >= 5);
        assert_eq!(reports.last().unwrap().files_found, 4);
    }
}
