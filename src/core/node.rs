//! The folder/file tree model shared by the builder, query engine and renderers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An ordered sequence of top-level nodes with no common parent.
pub type Forest = Vec<TreeNode>;

/// A node of the folder structure.
///
/// `path` is the slash-joined path from the selection root and is unique
/// within a tree; a child's `path` is always its parent's `path` + `/` + `name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TreeNode {
    Folder {
        name: String,
        path: String,
        children: Vec<TreeNode>,
    },
    File {
        name: String,
        path: String,
        size: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        modified_at: Option<DateTime<Utc>>,
    },
}

impl TreeNode {
    pub fn folder(name: impl Into<String>, path: impl Into<String>, children: Vec<TreeNode>) -> Self {
        TreeNode::Folder {
            name: name.into(),
            path: path.into(),
            children,
        }
    }

    pub fn file(
        name: impl Into<String>,
        path: impl Into<String>,
        size: u64,
        modified_at: Option<DateTime<Utc>>,
    ) -> Self {
        TreeNode::File {
            name: name.into(),
            path: path.into(),
            size,
            modified_at,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            TreeNode::Folder { name, .. } | TreeNode::File { name, .. } => name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            TreeNode::Folder { path, .. } | TreeNode::File { path, .. } => path,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, TreeNode::Folder { .. })
    }

    /// Children of a folder; files have none.
    pub fn children(&self) -> &[TreeNode] {
        match self {
            TreeNode::Folder { children, .. } => children,
            TreeNode::File { .. } => &[],
        }
    }

    /// File size in bytes; folders report `0`.
    pub fn size(&self) -> u64 {
        match self {
            TreeNode::File { size, .. } => *size,
            TreeNode::Folder { .. } => 0,
        }
    }

    pub fn modified_at(&self) -> Option<DateTime<Utc>> {
        match self {
            TreeNode::File { modified_at, .. } => *modified_at,
            TreeNode::Folder { .. } => None,
        }
    }

    /// Lowercase extension of a file name without the dot, `""` when there is none.
    pub fn extension(&self) -> String {
        match self {
            TreeNode::File { name, .. } => crate::core::rename::split_name(name)
                .1
                .trim_start_matches('.')
                .to_lowercase(),
            TreeNode::Folder { .. } => String::new(),
        }
    }
}
