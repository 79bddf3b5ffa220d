//! Error types for document reading

use thiserror::Error;

/// Errors reading an uploaded document
///
/// All of these describe a bad upload, not a server fault.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("unsupported file type '{filename}', expected {expected}")]
    UnsupportedFormat { filename: String, expected: &'static str },

    #[error("not a valid DOCX archive: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("DOCX archive has no {0}")]
    MissingPart(&'static str),

    #[error("failed to read document: {0}")]
    Io(#[from] std::io::Error),

    #[error("document is not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),

    #[error("invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid spreadsheet: {0}")]
    Spreadsheet(String),

    #[error("missing column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: task description is empty")]
    EmptyDescription { row: usize },

    #[error("row {row}: amount '{value}' is not a number")]
    InvalidAmount { row: usize, value: String },

    #[error("pattern error: {0}")]
    Pattern(#[from] regex::Error),
}

impl From<calamine::XlsxError> for DocumentError {
    fn from(e: calamine::XlsxError) -> Self {
        Self::Spreadsheet(e.to_string())
    }
}
