//! Extension-based file classification.

use serde::{Deserialize, Serialize};
use std::fmt;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "svg", "bmp", "ico"];
const DOCUMENT_EXTENSIONS: &[&str] = &["pdf", "doc", "docx", "txt", "rtf", "odt"];
const SPREADSHEET_EXTENSIONS: &[&str] = &["xls", "xlsx", "csv", "ods"];
const PRESENTATION_EXTENSIONS: &[&str] = &["ppt", "pptx", "odp"];
const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "rar", "7z", "tar", "gz"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "flv", "webm"];
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "aac", "flac", "ogg"];
const CODE_EXTENSIONS: &[&str] = &["js", "ts", "jsx", "tsx", "html", "css", "scss", "json", "xml", "rs"];

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileCategory {
    Image,
    Document,
    Spreadsheet,
    Presentation,
    Archive,
    Video,
    Audio,
    Code,
    Other,
}

impl FileCategory {
    /// Classifies a bare extension such as `"PNG"` or `"png"`.
    pub fn from_extension(extension: &str) -> Self {
        let ext = extension.trim_start_matches('.').to_lowercase();
        let table: [(&[&str], FileCategory); 8] = [
            (IMAGE_EXTENSIONS, FileCategory::Image),
            (DOCUMENT_EXTENSIONS, FileCategory::Document),
            (SPREADSHEET_EXTENSIONS, FileCategory::Spreadsheet),
            (PRESENTATION_EXTENSIONS, FileCategory::Presentation),
            (ARCHIVE_EXTENSIONS, FileCategory::Archive),
            (VIDEO_EXTENSIONS, FileCategory::Video),
            (AUDIO_EXTENSIONS, FileCategory::Audio),
            (CODE_EXTENSIONS, FileCategory::Code),
        ];
        table
            .iter()
            .find(|(extensions, _)| extensions.contains(&ext.as_str()))
            .map_or(FileCategory::Other, |(_, category)| *category)
    }

    pub fn for_name(name: &str) -> Self {
        let (_, extension) = crate::core::rename::split_name(name);
        Self::from_extension(extension)
    }

    pub fn label(self) -> &'static str {
        match self {
            FileCategory::Image => "IMAGE",
            FileCategory::Document => "DOCUMENT",
            FileCategory::Spreadsheet => "SPREADSHEET",
            FileCategory::Presentation => "PRESENTATION",
            FileCategory::Archive => "ARCHIVE",
            FileCategory::Video => "VIDEO",
            FileCategory::Audio => "AUDIO",
            FileCategory::Code => "CODE",
            FileCategory::Other => "OTHER",
        }
    }
}

impl fmt::Display for FileCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The MIME type for a file name, `application/octet-stream` when unknown.
pub fn mime_type_for(name: &str) -> String {
    mime_guess::from_path(name)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
