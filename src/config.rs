//! Run configuration
//!
//! Fixed conventions (file prefix, sheet name, ...) live in [`EtlConfig`],
//! which can be loaded from a YAML file and overridden from the command line.
//! Per-run inputs live in [`PipelineParams`].

use crate::error::{EtlError, EtlResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_FILE_PREFIX: &str = "AvanceVentasINTI";
pub const DEFAULT_FILE_EXTENSION: &str = ".xlsx";
pub const DEFAULT_SHEET_NAME: &str = "ITEM_O";
pub const DEFAULT_OUTPUT_FILE: &str = "Out.xlsx";
pub const DEFAULT_TOP_N: usize = 10;

/// Conventions shared by every run over a directory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EtlConfig {
    /// Source files must start with this
    pub file_prefix: String,
    /// Source files must end with this
    pub file_extension: String,
    /// Sheet read from every source file
    pub sheet_name: String,
    /// Written next to the inputs
    pub output_file_name: String,
    /// Ranking length
    pub top_n: usize,
    /// 1 reads files sequentially
    pub workers: usize,
    /// Reject file names whose date tokens are not a calendar date
    pub strict_dates: bool,
    /// Extra attempts when saving the output fails
    pub export_retries: u32,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            file_prefix: DEFAULT_FILE_PREFIX.to_string(),
            file_extension: DEFAULT_FILE_EXTENSION.to_string(),
            sheet_name: DEFAULT_SHEET_NAME.to_string(),
            output_file_name: DEFAULT_OUTPUT_FILE.to_string(),
            top_n: DEFAULT_TOP_N,
            workers: 1,
            strict_dates: false,
            export_retries: 0,
        }
    }
}

impl EtlConfig {
    /// Load a YAML configuration file; missing keys take their defaults
    pub fn load(path: &Path) -> EtlResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!("Cannot read config file {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> EtlResult<Self> {
        let config: EtlConfig = serde_yaml::from_str(content)
            .map_err(|e| EtlError::Config(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EtlResult<()> {
        if self.file_prefix.is_empty() {
            return Err(EtlError::Config("file_prefix must not be empty".to_string()));
        }
        if self.sheet_name.is_empty() {
            return Err(EtlError::Config("sheet_name must not be empty".to_string()));
        }
        if self.output_file_name.is_empty() {
            return Err(EtlError::Config(
                "output_file_name must not be empty".to_string(),
            ));
        }
        if self.top_n == 0 {
            return Err(EtlError::Config("top_n must be at least 1".to_string()));
        }
        if self.workers == 0 {
            return Err(EtlError::Config("workers must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Whether `file_name` names a source extract
    pub fn matches_source(&self, file_name: &str) -> bool {
        file_name.starts_with(&self.file_prefix) && file_name.ends_with(&self.file_extension)
    }
}

/// Inputs of a single run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineParams {
    pub directory: PathBuf,
    /// Column range expression, e.g. `"A:D"`
    pub column_range: String,
    /// Rows discarded before the header row
    pub skip_rows: usize,
}

impl PipelineParams {
    pub fn new(directory: impl Into<PathBuf>, column_range: impl Into<String>, skip_rows: usize) -> Self {
        Self {
            directory: directory.into(),
            column_range: column_range.into(),
            skip_rows,
        }
    }

    /// Build from a 1-based header row number as users enter it
    pub fn from_start_row(
        directory: impl Into<PathBuf>,
        column_range: impl Into<String>,
        start_row: usize,
    ) -> EtlResult<Self> {
        if start_row == 0 {
            return Err(EtlError::Config(
                "start row is 1-based and must be at least 1".to_string(),
            ));
        }
        Ok(Self::new(directory, column_range, start_row - 1))
    }

    pub fn output_path(&self, config: &EtlConfig) -> PathBuf {
        self.directory.join(&config.output_file_name)
    }
}
