//! ventas-etl - consolidate dated spreadsheet extracts
//!
//! This library reads every `AvanceVentasINTI.<year>.<month>.<day>.xlsx`
//! extract in a directory, merges their rows into one dataset tagged with the
//! period each row came from, writes it to `Out.xlsx`, and ranks the numeric
//! columns by mean.
//!
//! # Features
//!
//! - Column windows from range expressions (`A:D`) and a header-row offset
//! - Column-name keyed merge across files with differing headers
//! - Top-N ranking of numeric column means
//! - Optional bounded worker pool with deterministic row order
//! - Progress observer and cooperative cancellation
//!
//! # Example
//!
//! ```no_run
//! use ventas_etl::config::{EtlConfig, PipelineParams};
//! use ventas_etl::core::{NoProgress, Pipeline};
//!
//! let params = PipelineParams::from_start_row("/data/extracts", "A:D", 3)?;
//! let pipeline = Pipeline::new(EtlConfig::default())?;
//! let output = pipeline.run(&params, &NoProgress)?;
//!
//! println!("Rows: {}", output.dataset.len());
//! for stat in output.ranking.iter() {
//!     println!("{}: {}", stat.column, stat.mean);
//! }
//! # Ok::<(), ventas_etl::error::EtlError>(())
//! ```

pub mod cli;
pub mod columns;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod filename;
pub mod types;

// Re-export commonly used types
pub use config::{EtlConfig, PipelineParams};
pub use error::{EtlError, EtlResult};
pub use types::{CellValue, ColumnWindow, FileDate, SourceFile};
