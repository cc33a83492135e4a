use std::path::PathBuf;
use thiserror::Error;

pub type EtlResult<T> = Result<T, EtlError>;

/// Every failure a consolidation run can surface. Any of them aborts the run.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("No input files matching '{prefix}*{extension}' in {}", directory.display())]
    NoInput {
        directory: PathBuf,
        prefix: String,
        extension: String,
    },

    #[error("File name '{name}' does not match <prefix>.<year>.<month>.<day>.<ext>: {reason}")]
    FilenameFormat { name: String, reason: String },

    #[error("Invalid column range '{expression}': {reason}")]
    RangeFormat { expression: String, reason: String },

    #[error("Cannot read sheet '{sheet}' from {}: {reason}", path.display())]
    SheetRead {
        path: PathBuf,
        sheet: String,
        reason: String,
    },

    #[error("Cannot write {}: {reason}", path.display())]
    Export { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Run cancelled after {processed} of {total} files")]
    Cancelled { processed: usize, total: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EtlError {
    pub(crate) fn range(expression: &str, reason: impl Into<String>) -> Self {
        EtlError::RangeFormat {
            expression: expression.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn filename(name: &str, reason: impl Into<String>) -> Self {
        EtlError::FilenameFormat {
            name: name.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn sheet(path: &std::path::Path, sheet: &str, reason: impl Into<String>) -> Self {
        EtlError::SheetRead {
            path: path.to_path_buf(),
            sheet: sheet.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn export(path: &std::path::Path, reason: impl Into<String>) -> Self {
        EtlError::Export {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Short stable name of the error kind, for callers that present kinds differently.
    pub fn kind(&self) -> &'static str {
        match self {
            EtlError::NoInput { .. } => "NoInputError",
            EtlError::FilenameFormat { .. } => "FilenameFormatError",
            EtlError::RangeFormat { .. } => "RangeFormatError",
            EtlError::SheetRead { .. } => "SheetReadError",
            EtlError::Export { .. } => "ExportError",
            EtlError::Config(_) => "ConfigError",
            EtlError::Cancelled { .. } => "Cancelled",
            EtlError::Io(_) => "IoError",
        }
    }
}
