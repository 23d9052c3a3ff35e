pub mod file_type;
pub mod format;
pub mod test_helpers;

pub use file_type::{mime_type_for, FileCategory};
pub use format::{format_date, format_file_size};
