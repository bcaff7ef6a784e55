//! Error types for schedule export

use std::path::PathBuf;
use thiserror::Error;

/// Result type for export operations.
pub type Result<T> = std::result::Result<T, ExportError>;

/// Error types for schedule export.
///
/// Only the output-file errors and sink failures abort an export. Style
/// fallbacks and the header merge boundary case are absorbed with defaults
/// and never surface here.
#[derive(Error, Debug)]
pub enum ExportError {
    /// An existing file at the target path could not be deleted
    #[error("Can't remove existing export file {}: {source}", path.display())]
    RemoveExisting {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The target file could not be created
    #[error("Can't create export file {}: {source}", path.display())]
    CreateOutput {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Workbook write or save failure
    #[error("Workbook error: {0}")]
    Xlsx(#[from] rust_xlsxwriter::XlsxError),

    /// A source cell that cannot be addressed in the output worksheet
    #[error("Cell ({row}, {column}) maps outside the worksheet")]
    OutOfRange { row: i64, column: i64 },

    /// Schedule document is structurally invalid
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// IO error while reading a grid source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON schedule parse error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parse error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}
