//! Name-keyed union merge of per-file row sets
//!
//! The dataset keeps an ordered list of every column name seen so far. A row
//! stores values only for the columns known when it was appended; columns
//! discovered later read back as null for it. Columns are never matched by
//! position and never dropped.

use crate::types::{CellValue, FileDate, FileRows, TAG_COLUMNS};
use std::collections::HashMap;
use tracing::{debug, warn};

static NULL: CellValue = CellValue::Null;

/// One consolidated row: values for data columns plus its source file
#[derive(Debug, Clone, PartialEq)]
pub struct ConsolidatedRow {
    /// Index into [`ConsolidatedDataset::sources`]
    pub source: usize,
    cells: Vec<CellValue>,
}

/// A source file as it contributed to the dataset
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSummary {
    pub file_name: String,
    pub date: FileDate,
    pub rows: usize,
}

/// Every row of every source file, in discovery order then in-file order
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConsolidatedDataset {
    columns: Vec<String>,
    column_index: HashMap<String, usize>,
    rows: Vec<ConsolidatedRow>,
    sources: Vec<SourceSummary>,
}

impl ConsolidatedDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Data columns in first-seen order (without ANIO/MES/DIA)
    pub fn data_columns(&self) -> &[String] {
        &self.columns
    }

    /// All output columns: data columns, then ANIO, MES, DIA
    pub fn columns(&self) -> Vec<&str> {
        self.columns
            .iter()
            .map(String::as_str)
            .chain(TAG_COLUMNS)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_count(&self) -> usize {
        self.columns.len() + TAG_COLUMNS.len()
    }

    pub fn sources(&self) -> &[SourceSummary] {
        &self.sources
    }

    pub fn rows(&self) -> &[ConsolidatedRow] {
        &self.rows
    }

    /// Period tags of row `row`
    pub fn date(&self, row: usize) -> Option<&FileDate> {
        let source = self.rows.get(row)?.source;
        self.sources.get(source).map(|s| &s.date)
    }

    /// Value of a data column in a row; absent columns read as null
    pub fn data_value(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = *self.column_index.get(column)?;
        let row = self.rows.get(row)?;
        Some(row.cells.get(idx).unwrap_or(&NULL))
    }

    /// Value of any output column, ANIO/MES/DIA included
    pub fn get(&self, row: usize, column: &str) -> Option<CellValue> {
        if let Some(pos) = TAG_COLUMNS.iter().position(|tag| *tag == column) {
            let date = self.date(row)?;
            return Some(CellValue::Text(date.tags()[pos].to_string()));
        }
        self.data_value(row, column).cloned()
    }

    /// A full row in [`columns`](Self::columns) order
    pub fn row_values(&self, row: usize) -> Option<Vec<CellValue>> {
        let stored = self.rows.get(row)?;
        let source = self.sources.get(stored.source)?;

        let mut values: Vec<CellValue> = (0..self.columns.len())
            .map(|idx| stored.cells.get(idx).cloned().unwrap_or(CellValue::Null))
            .collect();
        values.extend(
            source
                .date
                .tags()
                .iter()
                .map(|tag| CellValue::Text(tag.to_string())),
        );
        Some(values)
    }

    /// Every row's value for a data column, nulls included
    pub fn column_values<'a>(&'a self, column: &str) -> impl Iterator<Item = &'a CellValue> + 'a {
        let idx = self.column_index.get(column).copied();
        self.rows.iter().map(move |row| match idx {
            Some(i) => row.cells.get(i).unwrap_or(&NULL),
            None => &NULL,
        })
    }

    fn column_slot(&mut self, name: &str) -> usize {
        if let Some(idx) = self.column_index.get(name) {
            return *idx;
        }
        let idx = self.columns.len();
        self.columns.push(name.to_string());
        self.column_index.insert(name.to_string(), idx);
        idx
    }

    /// Tag one file's rows with its date and append them
    fn append(&mut self, file: FileRows) {
        let FileRows { source, data } = file;

        // Sheet column position → dataset slot; tag-named columns are replaced by the tag
        let slots: Vec<Option<usize>> = data
            .columns
            .iter()
            .map(|name| {
                if TAG_COLUMNS.iter().any(|tag| *tag == name.as_str()) {
                    warn!(
                        file = %source.file_name(),
                        column = %name,
                        "source column overwritten by period tag"
                    );
                    None
                } else {
                    Some(self.column_slot(name))
                }
            })
            .collect();

        let source_idx = self.sources.len();
        let row_count = data.rows.len();
        let width = self.columns.len();

        for values in data.rows {
            let mut cells = vec![CellValue::Null; width];
            for (slot, value) in slots.iter().zip(values) {
                if let Some(idx) = slot {
                    cells[*idx] = value;
                }
            }
            self.rows.push(ConsolidatedRow {
                source: source_idx,
                cells,
            });
        }

        debug!(
            file = %source.file_name(),
            rows = row_count,
            columns = self.columns.len(),
            "file merged"
        );

        self.sources.push(SourceSummary {
            file_name: source.file_name(),
            date: source.date,
            rows: row_count,
        });
    }
}

/// Builds a [`ConsolidatedDataset`] one file at a time.
///
/// Files must be pushed in discovery order; row order follows push order.
#[derive(Debug, Default)]
pub struct Consolidator {
    dataset: ConsolidatedDataset,
}

impl Consolidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: FileRows) {
        self.dataset.append(file);
    }

    pub fn rows_so_far(&self) -> usize {
        self.dataset.len()
    }

    pub fn finish(self) -> ConsolidatedDataset {
        self.dataset
    }
}

/// Merge files in the order given
pub fn consolidate(files: impl IntoIterator<Item = FileRows>) -> ConsolidatedDataset {
    let mut consolidator = Consolidator::new();
    for file in files {
        consolidator.push(file);
    }
    consolidator.finish()
}
