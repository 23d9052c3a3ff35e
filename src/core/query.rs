//! Read-only operations over a built forest: statistics, search filtering and sorting.

use super::node::{Forest, TreeNode};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Aggregate counts over a forest.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub total_files: usize,
    pub total_folders: usize,
    pub total_size: u64,
    /// File count per lowercase extension; `""` collects files without one.
    pub file_types: BTreeMap<String, usize>,
}

impl TreeStats {
    pub fn total_items(&self) -> usize {
        self.total_files + self.total_folders
    }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortKey {
    #[default]
    Name,
    Size,
    Date,
    Type,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Ascending => SortOrder::Descending,
            SortOrder::Descending => SortOrder::Ascending,
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SortKey::Name => "name",
            SortKey::Size => "size",
            SortKey::Date => "date",
            SortKey::Type => "type",
        };
        f.write_str(label)
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "name" => Ok(SortKey::Name),
            "size" => Ok(SortKey::Size),
            "date" | "modified" => Ok(SortKey::Date),
            "type" | "extension" => Ok(SortKey::Type),
            other => Err(format!("unknown sort key '{other}'")),
        }
    }
}

/// A utility struct for querying forests.
///
/// This struct is stateless and provides methods as associated functions.
pub struct TreeQuery;

impl TreeQuery {
    pub fn stats(forest: &[TreeNode]) -> TreeStats {
        let mut stats = TreeStats::default();
        Self::accumulate(forest, &mut stats);
        stats
    }

    fn accumulate(nodes: &[TreeNode], stats: &mut TreeStats) {
        for node in nodes {
            match node {
                TreeNode::Folder { children, .. } => {
                    stats.total_folders += 1;
                    Self::accumulate(children, stats);
                }
                TreeNode::File { size, .. } => {
                    stats.total_files += 1;
                    stats.total_size += size;
                    *stats.file_types.entry(node.extension()).or_default() += 1;
                }
            }
        }
    }

    /// Keeps files whose name contains `query` (case-insensitive) and folders
    /// that either match themselves or still hold a kept descendant.
    ///
    /// A blank query returns the forest unchanged.
    pub fn filter(forest: &[TreeNode], query: &str) -> Forest {
        let query = query.trim();
        if query.is_empty() {
            return forest.to_vec();
        }
        let needle = query.to_lowercase();
        forest
            .iter()
            .filter_map(|node| Self::filter_node(node, &needle))
            .collect()
    }

    fn filter_node(node: &TreeNode, needle: &str) -> Option<TreeNode> {
        let matches = node.name().to_lowercase().contains(needle);
        match node {
            TreeNode::File { .. } => matches.then(|| node.clone()),
            TreeNode::Folder { name, path, children } => {
                let kept: Vec<TreeNode> = children
                    .iter()
                    .filter_map(|child| Self::filter_node(child, needle))
                    .collect();
                (matches || !kept.is_empty()).then(|| TreeNode::folder(name.clone(), path.clone(), kept))
            }
        }
    }

    /// Orders every level: folders always before files, then by `key` in `order`.
    pub fn sort(forest: &[TreeNode], key: SortKey, order: SortOrder) -> Forest {
        let mut sorted = forest.to_vec();
        Self::sort_in_place(&mut sorted, key, order);
        sorted
    }

    pub fn sort_in_place(nodes: &mut [TreeNode], key: SortKey, order: SortOrder) {
        // `sort_by` is stable, so equal keys keep their build order.
        nodes.sort_by(|a, b| Self::compare(a, b, key, order));
        for node in nodes.iter_mut() {
            if let TreeNode::Folder { children, .. } = node {
                Self::sort_in_place(children, key, order);
            }
        }
    }

    fn compare(a: &TreeNode, b: &TreeNode, key: SortKey, order: SortOrder) -> Ordering {
        // Folder-first is applied before the order so descending never moves files up.
        match (a.is_folder(), b.is_folder()) {
            (true, false) => return Ordering::Less,
            (false, true) => return Ordering::Greater,
            _ => {}
        }

        let by_key = match key {
            SortKey::Name => a.name().cmp(b.name()),
            SortKey::Size => a.size().cmp(&b.size()),
            // `None < Some(_)` puts files without a timestamp first, as the oldest.
            SortKey::Date => a.modified_at().cmp(&b.modified_at()),
            SortKey::Type => a.extension().cmp(&b.extension()),
        };

        match order {
            SortOrder::Ascending => by_key,
            SortOrder::Descending => by_key.reverse(),
        }
    }

    /// Paths of every file, depth-first in tree order.
    pub fn collect_leaf_paths(forest: &[TreeNode]) -> Vec<String> {
        let mut paths = Vec::new();
        Self::walk(forest, &mut |node| {
            if !node.is_folder() {
                paths.push(node.path().to_string());
            }
        });
        paths
    }

    /// Paths of every folder, depth-first in tree order.
    pub fn collect_folder_paths(forest: &[TreeNode]) -> Vec<String> {
        let mut paths = Vec::new();
        Self::walk(forest, &mut |node| {
            if node.is_folder() {
                paths.push(node.path().to_string());
            }
        });
        paths
    }

    /// Looks up a node by its full path.
    pub fn find<'a>(forest: &'a [TreeNode], path: &str) -> Option<&'a TreeNode> {
        for node in forest {
            if node.path() == path {
                return Some(node);
            }
            // Only descend where the path can live.
            if node.is_folder() && path.starts_with(node.path()) && path[node.path().len()..].starts_with('/') {
                if let Some(found) = Self::find(node.children(), path) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Visits every node depth-first, parents before children.
    pub fn walk<'a>(forest: &'a [TreeNode], visit: &mut dyn FnMut(&'a TreeNode)) {
        for node in forest {
            visit(node);
            Self::walk(node.children(), visit);
        }
    }
}
