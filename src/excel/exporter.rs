//! Excel exporter implementation - consolidated dataset and ranking → .xlsx

use crate::core::{ConsolidatedDataset, Ranking};
use crate::error::{EtlError, EtlResult};
use crate::types::CellValue;
use rust_xlsxwriter::{Chart, ChartDataLabel, ChartType, Format, Workbook, Worksheet, XlsxError};
use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Sheet holding the ranking table the charts point at
pub const RANKING_SHEET: &str = "Ranking";

const RETRY_DELAY: Duration = Duration::from_millis(250);

/// Writes a [`ConsolidatedDataset`] as a single-sheet workbook
pub struct DatasetExporter<'a> {
    dataset: &'a ConsolidatedDataset,
    retries: u32,
}

impl<'a> DatasetExporter<'a> {
    pub fn new(dataset: &'a ConsolidatedDataset) -> Self {
        Self {
            dataset,
            retries: 0,
        }
    }

    /// Extra save attempts after a failed one
    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = retries;
        self
    }

    /// Write the dataset to `output_path`.
    ///
    /// The workbook is saved to a temporary sibling and renamed into place, so
    /// a failed export never leaves a partial file at `output_path`.
    pub fn export(&self, output_path: &Path) -> EtlResult<()> {
        let mut workbook = self.build_workbook(output_path)?;

        let mut attempt = 0;
        loop {
            match save_atomically(&mut workbook, output_path) {
                Ok(()) => break,
                Err(e) if attempt < self.retries => {
                    attempt += 1;
                    warn!(attempt, error = %e, "export failed, retrying");
                    thread::sleep(RETRY_DELAY * attempt);
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            rows = self.dataset.len(),
            output = %output_path.display(),
            "dataset exported"
        );
        Ok(())
    }

    fn build_workbook(&self, output_path: &Path) -> EtlResult<Workbook> {
        let columns = self.dataset.columns();
        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();
        let export_err = |e: XlsxError| EtlError::export(output_path, e.to_string());

        let header_format = Format::new().set_bold();
        for (col_idx, name) in columns.iter().enumerate() {
            let col = column_number(col_idx, output_path)?;
            worksheet
                .write_string_with_format(0, col, *name, &header_format)
                .map_err(export_err)?;
        }

        for row_idx in 0..self.dataset.len() {
            let values = self.dataset.row_values(row_idx).ok_or_else(|| {
                EtlError::export(output_path, format!("row {} disappeared", row_idx))
            })?;
            let row = u32::try_from(row_idx + 1).map_err(|_| {
                EtlError::export(output_path, "too many rows for one worksheet")
            })?;

            for (col_idx, value) in values.iter().enumerate() {
                let col = column_number(col_idx, output_path)?;
                write_cell(worksheet, row, col, value).map_err(export_err)?;
            }
        }

        Ok(workbook)
    }
}

/// Writes the ranking table plus a column chart of means and a pie chart of shares
pub struct RankingChartExporter<'a> {
    ranking: &'a Ranking,
}

impl<'a> RankingChartExporter<'a> {
    pub fn new(ranking: &'a Ranking) -> Self {
        Self { ranking }
    }

    pub fn export(&self, output_path: &Path) -> EtlResult<()> {
        let mut workbook = Workbook::new();
        self.write_sheet(&mut workbook)
            .map_err(|e| EtlError::export(output_path, e.to_string()))?;
        save_atomically(&mut workbook, output_path)
    }

    fn write_sheet(&self, workbook: &mut Workbook) -> Result<(), XlsxError> {
        let worksheet = workbook.add_worksheet();
        worksheet.set_name(RANKING_SHEET)?;
        worksheet.set_column_width(0, 24)?;
        worksheet.set_column_width(1, 14)?;
        worksheet.set_column_width(2, 12)?;

        let header_format = Format::new().set_bold();
        let share_format = Format::new().set_num_format("0.0%");

        worksheet.write_string_with_format(0, 0, "Columna", &header_format)?;
        worksheet.write_string_with_format(0, 1, "Promedio", &header_format)?;
        worksheet.write_string_with_format(0, 2, "Proporcion", &header_format)?;

        for (idx, stat) in self.ranking.iter().enumerate() {
            let row = idx as u32 + 1;
            worksheet.write_string(row, 0, &stat.column)?;
            worksheet.write_number(row, 1, stat.mean)?;
            worksheet.write_number_with_format(row, 2, stat.share, &share_format)?;
        }

        if self.ranking.is_empty() {
            return Ok(());
        }
        let last_row = self.ranking.len() as u32;

        let mut bar = Chart::new(ChartType::Column);
        bar.add_series()
            .set_categories((RANKING_SHEET, 1, 0, last_row, 0))
            .set_values((RANKING_SHEET, 1, 1, last_row, 1));
        bar.title().set_name("Top Promedios por Columna");
        bar.x_axis().set_name("Columnas");
        bar.y_axis().set_name("Promedio");
        bar.legend().set_hidden();
        worksheet.insert_chart(1, 4, &bar)?;

        let mut pie = Chart::new(ChartType::Pie);
        pie.add_series()
            .set_categories((RANKING_SHEET, 1, 0, last_row, 0))
            .set_values((RANKING_SHEET, 1, 1, last_row, 1))
            .set_data_label(ChartDataLabel::new().show_percentage());
        pie.title().set_name("Distribucion de Top Promedios");
        worksheet.insert_chart(17, 4, &pie)?;

        Ok(())
    }
}

fn column_number(col_idx: usize, output_path: &Path) -> EtlResult<u16> {
    u16::try_from(col_idx)
        .map_err(|_| EtlError::export(output_path, "too many columns for one worksheet"))
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, value: &CellValue) -> Result<(), XlsxError> {
    match value {
        CellValue::Number(n) => {
            worksheet.write_number(row, col, *n)?;
        }
        CellValue::Text(s) => {
            worksheet.write_string(row, col, s)?;
        }
        CellValue::Bool(b) => {
            worksheet.write_boolean(row, col, *b)?;
        }
        CellValue::Null => {}
    }
    Ok(())
}

fn temp_path(output_path: &Path) -> PathBuf {
    let name = output_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.xlsx".to_string());
    output_path.with_file_name(format!(".{}.partial", name))
}

fn save_atomically(workbook: &mut Workbook, output_path: &Path) -> EtlResult<()> {
    let temp = temp_path(output_path);

    let saved = workbook
        .save(&temp)
        .map_err(|e| EtlError::export(output_path, e.to_string()))
        .and_then(|_| {
            fs::rename(&temp, output_path)
                .map_err(|e| EtlError::export(output_path, e.to_string()))
        });

    if saved.is_err() && temp.exists() {
        let _ = fs::remove_file(&temp);
    }
    saved
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_temp_path_is_hidden_sibling() {
        let temp = temp_path(Path::new("/data/Out.xlsx"));
        assert_eq!(temp, PathBuf::from("/data/.Out.xlsx.partial"));
    }

    #[test]
    fn test_export_to_missing_directory_fails_cleanly() {
        let dataset = ConsolidatedDataset::new();
        let output = PathBuf::from("/definitely/not/here/Out.xlsx");

        let err = DatasetExporter::new(&dataset).export(&output).unwrap_err();

        assert!(matches!(err, EtlError::Export { .. }));
        assert_eq!(err.kind(), "ExportError");
    }

    #[test]
    fn test_export_empty_dataset_writes_header_only() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("Out.xlsx");

        DatasetExporter::new(&ConsolidatedDataset::new())
            .export(&output)
            .unwrap();

        assert!(output.exists());
        assert!(!temp_path(&output).exists());
    }

    #[test]
    fn test_ranking_export_without_stats() {
        let dir = tempfile::TempDir::new().unwrap();
        let output = dir.path().join("ranking.xlsx");

        RankingChartExporter::new(&Ranking::default())
            .export(&output)
            .unwrap();

        assert!(output.exists());
    }
}
