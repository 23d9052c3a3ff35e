//! Reconstructs the folder/file hierarchy from flat leaf-file records.
//!
//! The builder keeps every node in an arena indexed by its full path. Folder
//! nodes are synthesized on demand while walking each record's ancestor
//! chain, so two files sharing an ancestor always share the same folder node.
//! Children keep their insertion order; ordering for display is left to
//! [`TreeQuery::sort`](super::query::TreeQuery::sort).

use super::ingest::{IngestedEntry, Selection};
use super::node::{Forest, TreeNode};
use super::path::PathSegments;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;

type NodeId = usize;

/// A record that contradicts a node already in the tree. The first-seen node
/// always wins; the conflicting record is dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathConflict {
    #[error("'{0}' is already a file and cannot also be a folder")]
    FileBlocksFolder(String),
    #[error("'{0}' is already a folder and cannot also be a file")]
    FolderBlocksFile(String),
    #[error("'{0}' was already added")]
    DuplicateFile(String),
    #[error("'{0}' has no usable path segments")]
    EmptyPath(String),
}

#[derive(Debug)]
enum ArenaKind {
    Folder { children: Vec<NodeId> },
    File {
        size: u64,
        modified_at: Option<DateTime<Utc>>,
    },
}

#[derive(Debug)]
struct ArenaNode {
    name: String,
    path: String,
    kind: ArenaKind,
}

/// Incrementally builds a [`Forest`] from leaf-file records.
#[derive(Debug, Default)]
pub struct TreeBuilder {
    nodes: Vec<ArenaNode>,
    index: HashMap<String, NodeId>,
    roots: Vec<NodeId>,
}

/// The result of building a whole selection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BuildOutcome {
    pub forest: Forest,
    /// Records rejected by the first-seen-wins conflict policy.
    pub conflicts: Vec<PathConflict>,
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with the selection's root folder already present, so it exists
    /// even when the selection holds no files.
    pub fn with_root(name: &str) -> Self {
        let mut builder = Self::new();
        if let Some(segments) = PathSegments::parse(name) {
            // A root name never contains separators; only the first segment counts.
            let root = segments.prefix(1);
            builder.push_node(None, root.clone(), root, ArenaKind::Folder { children: Vec::new() });
        }
        builder
    }

    /// Number of nodes created so far, folders included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Adds one file, creating any missing ancestor folders.
    pub fn insert(&mut self, entry: &IngestedEntry) -> Result<(), PathConflict> {
        let segments = PathSegments::parse(&entry.relative_path)
            .ok_or_else(|| PathConflict::EmptyPath(entry.relative_path.clone()))?;

        // Validate the whole chain before creating anything, so a rejected
        // record leaves no stray folders behind.
        for depth in 1..segments.len() {
            let prefix = segments.prefix(depth);
            if let Some(&id) = self.index.get(&prefix) {
                if !matches!(self.nodes[id].kind, ArenaKind::Folder { .. }) {
                    return Err(PathConflict::FileBlocksFolder(prefix));
                }
            }
        }
        let file_path = segments.joined();
        if let Some(&id) = self.index.get(&file_path) {
            return Err(match self.nodes[id].kind {
                ArenaKind::Folder { .. } => PathConflict::FolderBlocksFile(file_path),
                ArenaKind::File { .. } => PathConflict::DuplicateFile(file_path),
            });
        }

        let mut parent: Option<NodeId> = None;
        for (depth, name) in segments.ancestors().iter().enumerate() {
            let prefix = segments.prefix(depth + 1);
            let id = match self.index.get(&prefix) {
                Some(&id) => id,
                None => self.push_node(
                    parent,
                    name.clone(),
                    prefix,
                    ArenaKind::Folder { children: Vec::new() },
                ),
            };
            parent = Some(id);
        }

        self.push_node(
            parent,
            segments.leaf().to_string(),
            file_path,
            ArenaKind::File {
                size: entry.size,
                modified_at: entry.modified_at,
            },
        );
        Ok(())
    }

    fn push_node(&mut self, parent: Option<NodeId>, name: String, path: String, kind: ArenaKind) -> NodeId {
        let id = self.nodes.len();
        self.index.insert(path.clone(), id);
        self.nodes.push(ArenaNode { name, path, kind });

        match parent {
            Some(parent_id) => {
                if let ArenaKind::Folder { children } = &mut self.nodes[parent_id].kind {
                    children.push(id);
                }
            }
            None => self.roots.push(id),
        }
        id
    }

    /// Consumes the arena and produces the owned forest.
    pub fn finish(self) -> Forest {
        let mut slots: Vec<Option<ArenaNode>> = self.nodes.into_iter().map(Some).collect();
        self.roots
            .iter()
            .filter_map(|&id| Self::take_subtree(&mut slots, id))
            .collect()
    }

    fn take_subtree(slots: &mut [Option<ArenaNode>], id: NodeId) -> Option<TreeNode> {
        let node = slots.get_mut(id)?.take()?;
        Some(match node.kind {
            ArenaKind::Folder { children } => TreeNode::Folder {
                name: node.name,
                path: node.path,
                children: children
                    .into_iter()
                    .filter_map(|child| Self::take_subtree(slots, child))
                    .collect(),
            },
            ArenaKind::File { size, modified_at } => TreeNode::File {
                name: node.name,
                path: node.path,
                size,
                modified_at,
            },
        })
    }
}

/// Builds a forest from records, dropping conflicting ones.
pub fn build(entries: &[IngestedEntry]) -> Forest {
    build_entries(TreeBuilder::new(), entries).forest
}

/// Builds a whole selection. With `keep_empty_root`, a selected folder shows
/// up as a root node even if it holds no files.
pub fn build_selection(selection: &Selection, keep_empty_root: bool) -> BuildOutcome {
    let builder = match (&selection.root_name, keep_empty_root) {
        (Some(root), true) => TreeBuilder::with_root(root),
        _ => TreeBuilder::new(),
    };
    build_entries(builder, &selection.entries)
}

fn build_entries(mut builder: TreeBuilder, entries: &[IngestedEntry]) -> BuildOutcome {
    let mut conflicts = Vec::new();
    for entry in entries {
        if let Err(conflict) = builder.insert(entry) {
            tracing::warn!("Ignoring {:?}: {}", entry.handle, conflict);
            conflicts.push(conflict);
        }
    }
    tracing::debug!("Built tree with {} nodes", builder.len());
    BuildOutcome {
        forest: builder.finish(),
        conflicts,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::path::join_path;
    use crate::core::query::TreeQuery;
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use tracing_test::traced_test;

    fn entry(path: &str, size: u64) -> IngestedEntry {
        IngestedEntry::new(path, format!("/tmp/{path}"), size, None)
    }

    fn find<'a>(forest: &'a [TreeNode], path: &str) -> Option<&'a TreeNode> {
        TreeQuery::find(forest, path)
    }

    #[test]
    fn test_shared_ancestor_is_created_once() {
        let forest = build(&[entry("a/b/x.txt", 1), entry("a/b/y.txt", 2)]);

        assert_eq!(forest.len(), 1);
        let folders = TreeQuery::collect_folder_paths(&forest);
        assert_eq!(folders, vec!["a".to_string(), "a/b".to_string()]);

        let b = find(&forest, "a/b").unwrap();
        let names: Vec<_> = b.children().iter().map(TreeNode::name).collect();
        assert_eq!(names, vec!["x.txt", "y.txt"]);
    }

    #[test]
    fn test_end_to_end_shape() {
        let forest = build(&[
            entry("proj/img/logo.png", 1000),
            entry("proj/img/icon.png", 500),
            entry("proj/readme.txt", 200),
        ]);

        let expected = vec![TreeNode::folder(
            "proj",
            "proj",
            vec![
                TreeNode::folder(
                    "img",
                    "proj/img",
                    vec![
                        TreeNode::file("logo.png", "proj/img/logo.png", 1000, None),
                        TreeNode::file("icon.png", "proj/img/icon.png", 500, None),
                    ],
                ),
                TreeNode::file("readme.txt", "proj/readme.txt", 200, None),
            ],
        )];
        assert_eq!(forest, expected);
    }

    #[test]
    fn test_single_segment_paths_are_root_files() {
        let forest = build(&[entry("a.txt", 1), entry("dir/b.txt", 1)]);
        assert_eq!(forest.len(), 2);
        assert!(!forest[0].is_folder());
        assert_eq!(forest[0].path(), "a.txt");
        assert!(forest[1].is_folder());
    }

    #[test]
    fn test_malformed_paths_are_normalized() {
        let forest = build(&[entry("/proj//src/main.rs", 1), entry("proj/src/lib.rs/", 1)]);
        assert_eq!(
            TreeQuery::collect_leaf_paths(&forest),
            vec!["proj/src/main.rs".to_string(), "proj/src/lib.rs".to_string()]
        );
        assert_eq!(TreeQuery::collect_folder_paths(&forest).len(), 2);
    }

    #[test]
    fn test_empty_input_is_empty_forest() {
        assert!(build(&[]).is_empty());
        let outcome = build_selection(&Selection::default(), true);
        assert!(outcome.forest.is_empty());
    }

    #[test]
    fn test_seeded_root_survives_empty_selection() {
        let selection = Selection {
            root_name: Some("empty".to_string()),
            ..Default::default()
        };
        let outcome = build_selection(&selection, true);
        assert_eq!(outcome.forest, vec![TreeNode::folder("empty", "empty", vec![])]);

        let outcome = build_selection(&selection, false);
        assert!(outcome.forest.is_empty());
    }

    #[test]
    fn test_seeded_root_is_reused_by_entries() {
        let selection = Selection {
            root_name: Some("proj".to_string()),
            entries: vec![entry("proj/a.txt", 1)],
            skipped: 0,
        };
        let outcome = build_selection(&selection, true);
        assert_eq!(outcome.forest.len(), 1);
        assert_eq!(outcome.forest[0].children().len(), 1);
    }

    #[test]
    fn test_same_input_same_output() {
        let entries = vec![entry("p/z.txt", 1), entry("p/a/b.txt", 2), entry("q.txt", 3)];
        assert_eq!(build(&entries), build(&entries));
    }

    #[traced_test]
    #[test]
    fn test_file_then_folder_conflict_keeps_first() {
        let mut builder = TreeBuilder::new();
        builder.insert(&entry("a/b", 5)).unwrap();
        let err = builder.insert(&entry("a/b/c.txt", 1)).unwrap_err();
        assert_eq!(err, PathConflict::FileBlocksFolder("a/b".to_string()));

        let outcome = build_entries(TreeBuilder::new(), &[entry("a/b", 5), entry("a/b/c.txt", 1)]);
        assert_eq!(outcome.conflicts.len(), 1);
        let b = find(&outcome.forest, "a/b").unwrap();
        assert!(!b.is_folder());
        assert_eq!(b.size(), 5);
        assert!(logs_contain("already a file"));
    }

    #[test]
    fn test_folder_then_file_conflict_keeps_first() {
        let outcome = build_entries(TreeBuilder::new(), &[entry("a/b/c.txt", 1), entry("a/b", 5)]);
        assert_eq!(outcome.conflicts, vec![PathConflict::FolderBlocksFile("a/b".to_string())]);
        assert!(find(&outcome.forest, "a/b").unwrap().is_folder());
    }

    #[test]
    fn test_duplicate_file_keeps_first() {
        let outcome = build_entries(TreeBuilder::new(), &[entry("a/x.txt", 1), entry("a//x.txt", 9)]);
        assert_eq!(outcome.conflicts, vec![PathConflict::DuplicateFile("a/x.txt".to_string())]);
        assert_eq!(find(&outcome.forest, "a/x.txt").unwrap().size(), 1);
    }

    #[test]
    fn test_rejected_entry_leaves_no_stray_folders() {
        let outcome = build_entries(TreeBuilder::new(), &[entry("a/b", 5), entry("a/b/c/d.txt", 1)]);
        assert_eq!(TreeQuery::collect_folder_paths(&outcome.forest), vec!["a".to_string()]);
    }

    #[test]
    fn test_empty_path_is_rejected() {
        let mut builder = TreeBuilder::new();
        assert!(matches!(builder.insert(&entry("//", 1)), Err(PathConflict::EmptyPath(_))));
        assert!(builder.is_empty());
    }

    fn path_set() -> impl Strategy<Value = BTreeSet<String>> {
        // Folders never contain a dot and files always do, so generated paths never conflict.
        let folder = "[a-d]{1,2}";
        let file = "[a-d]{1,2}\\.txt";
        let path = (prop::collection::vec(folder, 0..4), file)
            .prop_map(|(mut dirs, leaf)| {
                dirs.push(leaf);
                dirs.join("/")
            });
        prop::collection::btree_set(path, 0..40)
    }

    proptest! {
        #[test]
        fn prop_round_trip_preserves_leaf_paths(paths in path_set()) {
            let entries: Vec<_> = paths.iter().map(|p| entry(p, 1)).collect();
            let forest = build(&entries);
            let leaves: BTreeSet<String> = TreeQuery::collect_leaf_paths(&forest).into_iter().collect();
            prop_assert_eq!(leaves, paths);
        }

        #[test]
        fn prop_folder_paths_are_unique(paths in path_set()) {
            let entries: Vec<_> = paths.iter().map(|p| entry(p, 1)).collect();
            let folders = TreeQuery::collect_folder_paths(&build(&entries));
            let unique: BTreeSet<_> = folders.iter().cloned().collect();
            prop_assert_eq!(unique.len(), folders.len());
        }

        #[test]
        fn prop_child_paths_extend_parent_paths(paths in path_set()) {
            let entries: Vec<_> = paths.iter().map(|p| entry(p, 1)).collect();
            fn check(node: &TreeNode) -> bool {
                node.children().iter().all(|child| {
                    child.path() == join_path(node.path(), child.name()) && check(child)
                })
            }
            prop_assert!(build(&entries).iter().all(check));
        }
    }
}
