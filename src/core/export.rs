//! Serializes a forest into downloadable reports.
//!
//! Every renderer walks the forest in its current order, so exporting the
//! visible (filtered and sorted) forest reproduces what the user sees.

use super::error::CoreError;
use super::node::TreeNode;
use super::query::{TreeQuery, TreeStats};
use crate::utils::format::{format_date, format_file_size};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::str::FromStr;

const EXPORT_VERSION: &str = "1.0";
const CSV_HEADER: &str = "Type,Name,Path,Size,Extension,Modified";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
    Txt,
    /// A self-contained page laid out for printing to PDF.
    Html,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Txt => "txt",
            ExportFormat::Html => "html",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
            ExportFormat::Txt => "text/plain",
            ExportFormat::Html => "text/html",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "txt" | "text" => Ok(ExportFormat::Txt),
            "html" | "pdf" => Ok(ExportFormat::Html),
            other => Err(format!("unsupported export format '{other}'")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Per-file detail lines (size, type, modification date).
    pub include_metadata: bool,
    /// Append the statistics section.
    pub include_stats: bool,
    pub project_name: String,
    pub generated_at: DateTime<Utc>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            include_metadata: true,
            include_stats: true,
            project_name: "Files & Folders".to_string(),
            generated_at: Utc::now(),
        }
    }
}

#[derive(Serialize)]
struct JsonExport<'a> {
    metadata: JsonMetadata,
    file_system: &'a [TreeNode],
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<TreeStats>,
}

#[derive(Serialize)]
struct JsonMetadata {
    export_date: DateTime<Utc>,
    total_items: usize,
    format: ExportFormat,
    version: &'static str,
}

/// `files-folders-export-2024-03-04.csv` style names.
pub fn default_file_name(format: ExportFormat, basename: &str, date: NaiveDate) -> String {
    format!("{basename}-{}.{}", date.format("%Y-%m-%d"), format.extension())
}

pub fn render_export(format: ExportFormat, forest: &[TreeNode], options: &ExportOptions) -> Result<String, serde_json::Error> {
    Ok(match format {
        ExportFormat::Csv => render_csv(forest),
        ExportFormat::Json => render_json(forest, options)?,
        ExportFormat::Txt => render_txt(forest, options),
        ExportFormat::Html => render_html(forest, options),
    })
}

/// Renders and writes the export into `dir`, returning the written file's path.
pub async fn write_export(
    dir: &Path,
    basename: &str,
    format: ExportFormat,
    forest: &[TreeNode],
    options: &ExportOptions,
) -> Result<PathBuf, CoreError> {
    let content = render_export(format, forest, options)
        .map_err(|e| CoreError::Io(e.into(), dir.to_path_buf()))?;

    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| CoreError::Io(e, dir.to_path_buf()))?;

    let path = dir.join(default_file_name(format, basename, options.generated_at.date_naive()));
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| CoreError::Io(e, path.clone()))?;

    tracing::info!("Exported {} report to {:?}", format, path);
    Ok(path)
}

fn csv_quote(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}

fn render_csv(forest: &[TreeNode]) -> String {
    let mut rows = vec![CSV_HEADER.to_string()];
    TreeQuery::walk(forest, &mut |node| {
        let row = [
            if node.is_folder() { "folder".to_string() } else { "file".to_string() },
            csv_quote(node.name()),
            csv_quote(node.path()),
            node.size().to_string(),
            node.extension(),
            node.modified_at().map(|d| csv_quote(&format_date(&d))).unwrap_or_default(),
        ];
        rows.push(row.join(","));
    });
    rows.join("\n")
}

fn render_json(forest: &[TreeNode], options: &ExportOptions) -> Result<String, serde_json::Error> {
    let stats = TreeQuery::stats(forest);
    let export = JsonExport {
        metadata: JsonMetadata {
            export_date: options.generated_at,
            total_items: stats.total_items(),
            format: ExportFormat::Json,
            version: EXPORT_VERSION,
        },
        file_system: forest,
        stats: options.include_stats.then_some(stats),
    };
    serde_json::to_string_pretty(&export)
}

fn render_txt(forest: &[TreeNode], options: &ExportOptions) -> String {
    let stats = TreeQuery::stats(forest);
    let mut content = String::new();
    content.push_str("FILES & FOLDERS EXPORT REPORT\n");
    content.push_str(&"=".repeat(50));
    content.push_str("\n\n");
    let _ = writeln!(content, "Export Date: {}", format_date(&options.generated_at));
    let _ = writeln!(content, "Total Items: {}\n", stats.total_items());

    content.push_str("FILE SYSTEM STRUCTURE:\n");
    content.push_str(&"-".repeat(30));
    content.push('\n');
    write_txt_nodes(&mut content, forest, 0, options.include_metadata);

    if options.include_stats {
        content.push_str("\n\nSTATISTICS:\n");
        content.push_str(&"-".repeat(20));
        content.push('\n');
        let _ = writeln!(content, "Total Files: {}", stats.total_files);
        let _ = writeln!(content, "Total Folders: {}", stats.total_folders);
        let _ = writeln!(content, "Total Size: {}", format_file_size(stats.total_size));

        if !stats.file_types.is_empty() {
            content.push_str("\nFile Types:\n");
            for (extension, count) in &stats.file_types {
                let label = if extension.is_empty() { "(none)" } else { extension };
                let _ = writeln!(content, "  {label}: {count}");
            }
        }
    }

    content
}

fn write_txt_nodes(content: &mut String, nodes: &[TreeNode], depth: usize, include_metadata: bool) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            TreeNode::Folder { name, children, .. } => {
                let _ = writeln!(content, "{indent}📁 {name}");
                write_txt_nodes(content, children, depth + 1, include_metadata);
            }
            TreeNode::File { name, size, modified_at, .. } => {
                let _ = writeln!(content, "{indent}📄 {name}");
                if include_metadata {
                    let _ = writeln!(content, "{indent}   Size: {}", format_file_size(*size));
                    let _ = writeln!(content, "{indent}   Type: {}", node.extension());
                    if let Some(modified) = modified_at {
                        let _ = writeln!(content, "{indent}   Modified: {}", format_date(modified));
                    }
                }
            }
        }
    }
}

fn escape_html(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

const HTML_STYLE: &str = "\
* { margin: 0; padding: 0; box-sizing: border-box; }
body { font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif; line-height: 1.4; color: #333; padding: 15mm; font-size: 11px; }
@page { size: A4 portrait; margin: 15mm; }
.header { text-align: center; margin-bottom: 20px; border-bottom: 2px solid #7c2d12; padding-bottom: 15px; }
.header h1 { color: #7c2d12; font-size: 18px; margin-bottom: 8px; }
.subtitle { color: #6b7280; font-size: 12px; }
.summary { display: flex; gap: 10px; margin-bottom: 20px; }
.summary div { background: #f3f4f6; padding: 8px; border-radius: 6px; flex: 1; }
.label { font-weight: 600; font-size: 9px; text-transform: uppercase; color: #374151; }
ul.tree { list-style: none; padding-left: 16px; }
ul.tree > li { padding: 2px 0; }
.meta { color: #6b7280; margin-left: 6px; }
";

fn render_html(forest: &[TreeNode], options: &ExportOptions) -> String {
    let stats = TreeQuery::stats(forest);
    let project = escape_html(&options.project_name);
    let mut html = String::new();

    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html lang=\"en\">");
    let _ = writeln!(html, "<head>");
    let _ = writeln!(html, "<meta charset=\"UTF-8\">");
    let _ = writeln!(html, "<title>Project Files Report - {project}</title>");
    let _ = writeln!(html, "<style>\n{HTML_STYLE}</style>");
    let _ = writeln!(html, "</head>");
    let _ = writeln!(html, "<body>");
    let _ = writeln!(html, "<div class=\"header\">");
    let _ = writeln!(html, "<h1>{project}</h1>");
    let _ = writeln!(
        html,
        "<div class=\"subtitle\">Generated {}</div>",
        escape_html(&format_date(&options.generated_at))
    );
    let _ = writeln!(html, "</div>");

    if options.include_stats {
        let _ = writeln!(html, "<div class=\"summary\">");
        let _ = writeln!(html, "<div><div class=\"label\">Files</div>{}</div>", stats.total_files);
        let _ = writeln!(html, "<div><div class=\"label\">Folders</div>{}</div>", stats.total_folders);
        let _ = writeln!(
            html,
            "<div><div class=\"label\">Total Size</div>{}</div>",
            format_file_size(stats.total_size)
        );
        let _ = writeln!(html, "</div>");
    }

    if forest.is_empty() {
        let _ = writeln!(html, "<p>No files or folders found</p>");
    } else {
        write_html_list(&mut html, forest, options.include_metadata);
    }

    let _ = writeln!(html, "</body>");
    let _ = writeln!(html, "</html>");
    html
}

fn write_html_list(html: &mut String, nodes: &[TreeNode], include_metadata: bool) {
    let _ = writeln!(html, "<ul class=\"tree\">");
    for node in nodes {
        match node {
            TreeNode::Folder { name, children, .. } => {
                let _ = writeln!(html, "<li>📁 {}", escape_html(name));
                if !children.is_empty() {
                    write_html_list(html, children, include_metadata);
                }
                let _ = writeln!(html, "</li>");
            }
            TreeNode::File { name, size, modified_at, .. } => {
                let _ = write!(html, "<li>📄 {}", escape_html(name));
                if include_metadata {
                    let mut meta = format_file_size(*size);
                    if let Some(modified) = modified_at {
                        meta.push_str(", ");
                        meta.push_str(&format_date(modified));
                    }
                    let _ = write!(html, "<span class=\"meta\">({})</span>", escape_html(&meta));
                }
                let _ = writeln!(html, "</li>");
            }
        }
    }
    let _ = writeln!(html, "</ul>");
}
