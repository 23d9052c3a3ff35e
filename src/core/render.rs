//! Renders a forest as a box-drawing text tree.

use super::node::TreeNode;
use crate::utils::format::format_file_size;
use std::collections::HashSet;

const EMPTY_MESSAGE: &str = "No files or folders found";

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Header line; `.` when unset.
    pub root_label: Option<String>,
    /// Append human-readable sizes to file lines.
    pub show_sizes: bool,
    /// Ignore the expanded set and render every folder open.
    pub expand_all: bool,
}

/// A utility struct for rendering text trees.
///
/// This struct is stateless and provides methods as associated functions.
pub struct TreeRenderer;

impl TreeRenderer {
    /// Renders `forest` in its current order, descending only into folders
    /// whose path is in `expanded` (or all of them with `expand_all`).
    pub fn render(forest: &[TreeNode], expanded: &HashSet<String>, options: &RenderOptions) -> String {
        let mut result = String::new();
        let label = options.root_label.as_deref().unwrap_or(".");
        result.push_str(&format!("{label}/\n"));

        if forest.is_empty() {
            result.push_str(EMPTY_MESSAGE);
            result.push('\n');
            return result;
        }

        Self::render_children(forest, expanded, options, &mut result, "");
        result
    }

    fn render_children(
        nodes: &[TreeNode],
        expanded: &HashSet<String>,
        options: &RenderOptions,
        result: &mut String,
        prefix: &str,
    ) {
        for (i, node) in nodes.iter().enumerate() {
            let is_last = i == nodes.len() - 1;
            let connector = if is_last { "└── " } else { "├── " };

            match node {
                TreeNode::Folder { name, path, children } => {
                    result.push_str(&format!("{prefix}{connector}📁 {name}\n"));
                    if options.expand_all || expanded.contains(path) {
                        let new_prefix = if is_last {
                            format!("{prefix}    ")
                        } else {
                            format!("{prefix}│   ")
                        };
                        Self::render_children(children, expanded, options, result, &new_prefix);
                    }
                }
                TreeNode::File { name, size, .. } => {
                    if options.show_sizes {
                        result.push_str(&format!("{prefix}{connector}📄 {name} ({})\n", format_file_size(*size)));
                    } else {
                        result.push_str(&format!("{prefix}{connector}📄 {name}\n"));
                    }
                }
            }
        }
    }
}
