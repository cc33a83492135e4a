//! Sheet reader implementation - one extract (.xlsx) → header + rows

use crate::error::{EtlError, EtlResult};
use crate::types::{CellValue, ColumnWindow, SheetData};
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{Duration, NaiveDate};
use std::collections::HashSet;
use std::path::Path;
use tracing::debug;

/// Reads the target sheet of an extract through a column window
#[derive(Debug, Clone)]
pub struct SheetReader {
    sheet_name: String,
    window: ColumnWindow,
    skip_rows: usize,
}

impl SheetReader {
    pub fn new(sheet_name: impl Into<String>, window: ColumnWindow, skip_rows: usize) -> Self {
        Self {
            sheet_name: sheet_name.into(),
            window,
            skip_rows,
        }
    }

    pub fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    /// Read one file. Only the named sheet is opened.
    pub fn read(&self, path: &Path) -> EtlResult<SheetData> {
        let mut workbook = open_workbook_auto(path)
            .map_err(|e| EtlError::sheet(path, &self.sheet_name, format!("cannot open: {}", e)))?;

        let sheet_names = workbook.sheet_names();
        if !sheet_names.iter().any(|name| name == &self.sheet_name) {
            return Err(EtlError::sheet(
                path,
                &self.sheet_name,
                format!("sheet not found (available: {})", sheet_names.join(", ")),
            ));
        }

        let range = workbook
            .worksheet_range(&self.sheet_name)
            .map_err(|e| EtlError::sheet(path, &self.sheet_name, e.to_string()))?;

        let data = self
            .read_range(&range)
            .map_err(|reason| EtlError::sheet(path, &self.sheet_name, reason))?;

        debug!(
            file = %path.display(),
            columns = data.columns.len(),
            rows = data.rows.len(),
            "sheet read"
        );
        Ok(data)
    }

    /// Turn a worksheet range into header + rows.
    ///
    /// Works on absolute sheet coordinates, so blank leading rows and columns
    /// count toward the skip and the window exactly as they appear in Excel.
    pub(crate) fn read_range(&self, range: &Range<Data>) -> Result<SheetData, String> {
        let (total_rows, last_col) = match range.end() {
            Some((row, col)) if !range.is_empty() => (row as usize + 1, col as usize),
            _ => (0, 0),
        };

        if self.skip_rows >= total_rows {
            return Err(format!(
                "cannot skip {} rows: sheet has {} rows and no header row would remain",
                self.skip_rows, total_rows
            ));
        }

        // Window positions past the sheet's last column hold nothing
        let positions: Vec<usize> = self
            .window
            .positions()
            .iter()
            .copied()
            .filter(|pos| *pos <= last_col)
            .collect();

        let header_row = self.skip_rows;
        let columns = header_names(range, header_row, &positions);
        let mut data = SheetData::new(columns);

        for row in (header_row + 1)..total_rows {
            let values: Vec<CellValue> = positions
                .iter()
                .map(|col| cell_value(cell_at(range, row, *col)))
                .collect();

            if values.iter().all(CellValue::is_null) {
                continue;
            }
            data.rows.push(values);
        }

        Ok(data)
    }
}

fn cell_at(range: &Range<Data>, row: usize, col: usize) -> Option<&Data> {
    range.get_value((row as u32, col as u32))
}

/// Header names for the window: blank headers become `Unnamed: <n>`,
/// repeated names get `.1`, `.2`, ... suffixes.
fn header_names(range: &Range<Data>, header_row: usize, positions: &[usize]) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut names = Vec::with_capacity(positions.len());

    for (idx, col) in positions.iter().enumerate() {
        let base = match cell_at(range, header_row, *col) {
            Some(Data::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
            Some(Data::Int(i)) => i.to_string(),
            Some(Data::Float(f)) => f.to_string(),
            Some(Data::Bool(b)) => b.to_string(),
            Some(Data::Empty) | Some(Data::String(_)) | Some(Data::Error(_)) | None => {
                format!("Unnamed: {}", idx)
            }
            Some(other) => other.to_string(),
        };

        let mut name = base.clone();
        let mut suffix = 1;
        while seen.contains(&name) {
            name = format!("{}.{}", base, suffix);
            suffix += 1;
        }
        seen.insert(name.clone());
        names.push(name);
    }

    names
}

/// Convert a calamine cell to a dataset value
fn cell_value(cell: Option<&Data>) -> CellValue {
    match cell {
        None | Some(Data::Empty) | Some(Data::Error(_)) => CellValue::Null,
        Some(Data::Int(i)) => CellValue::Number(*i as f64),
        Some(Data::Float(f)) => CellValue::Number(*f),
        Some(Data::Bool(b)) => CellValue::Bool(*b),
        Some(Data::String(s)) if s.is_empty() => CellValue::Null,
        Some(Data::String(s)) => CellValue::Text(s.clone()),
        Some(Data::DateTime(dt)) if dt.is_duration() => CellValue::Text(dt.as_f64().to_string()),
        Some(Data::DateTime(dt)) => CellValue::Text(
            excel_serial_to_iso(dt.as_f64()).unwrap_or_else(|| dt.as_f64().to_string()),
        ),
        Some(Data::DateTimeIso(s)) | Some(Data::DurationIso(s)) => CellValue::Text(s.clone()),
    }
}

/// Excel serial day number (1900 system) → `YYYY-MM-DD[ HH:MM:SS]`
fn excel_serial_to_iso(serial: f64) -> Option<String> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let days = serial.trunc() as i64;
    let seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    let moment = epoch
        .checked_add_signed(Duration::try_days(days)?)?
        .checked_add_signed(Duration::try_seconds(seconds)?)?;

    if seconds == 0 {
        Some(moment.format("%Y-%m-%d").to_string())
    } else {
        Some(moment.format("%Y-%m-%d %H:%M:%S").to_string())
    }
}
