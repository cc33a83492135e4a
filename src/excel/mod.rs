//! Excel import/export for extract consolidation
//!
//! - Read: one extract's target sheet → header + rows
//! - Write: consolidated dataset → `Out.xlsx`, ranking → chart workbook

mod exporter;
mod reader;

pub use exporter::{DatasetExporter, RankingChartExporter, RANKING_SHEET};
pub use reader::SheetReader;
