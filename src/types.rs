use serde::Serialize;
use std::fmt;
use std::path::PathBuf;

/// Year column appended to every consolidated row
pub const ANIO: &str = "ANIO";
/// Month column appended to every consolidated row
pub const MES: &str = "MES";
/// Day column appended to every consolidated row
pub const DIA: &str = "DIA";

/// Period tag columns, in output order
pub const TAG_COLUMNS: [&str; 3] = [ANIO, MES, DIA];

//==============================================================================
// Cell values
//==============================================================================

/// A single scalar read from a sheet cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// Integer or floating point cell
    Number(f64),
    /// Text cell (dates and times are carried as ISO text)
    Text(String),
    /// Boolean cell
    Bool(bool),
    /// Empty cell, error cell, or a column the row's source file lacks
    Null,
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            CellValue::Number(_) => "Number",
            CellValue::Text(_) => "Text",
            CellValue::Bool(_) => "Bool",
            CellValue::Null => "Null",
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Null => Ok(()),
        }
    }
}

//==============================================================================
// Source files
//==============================================================================

/// Date tokens taken literally from a source file name.
///
/// Tokens keep their original text ("05" stays "05") so the tag written to the
/// output matches the file name exactly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDate {
    pub year: String,
    pub month: String,
    pub day: String,
}

impl FileDate {
    pub fn new(year: impl Into<String>, month: impl Into<String>, day: impl Into<String>) -> Self {
        Self {
            year: year.into(),
            month: month.into(),
            day: day.into(),
        }
    }

    /// Tag values in ANIO, MES, DIA order
    pub fn tags(&self) -> [&str; 3] {
        [&self.year, &self.month, &self.day]
    }
}

impl fmt::Display for FileDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.year, self.month, self.day)
    }
}

/// A discovered extract, immutable once created
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    pub path: PathBuf,
    /// Position in discovery order
    pub index: usize,
    pub date: FileDate,
}

impl SourceFile {
    pub fn new(path: PathBuf, index: usize, date: FileDate) -> Self {
        Self { path, index, date }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

//==============================================================================
// Column windows and sheet data
//==============================================================================

/// Zero-based column positions selected for reading.
///
/// Positions are unique and strictly increasing; the only constructor is
/// [`crate::columns::parse_column_range`] (plus `contiguous` for callers that
/// already hold validated bounds).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnWindow {
    positions: Vec<usize>,
}

impl ColumnWindow {
    /// Inclusive window `first..=last`. Callers guarantee `first <= last`.
    pub(crate) fn contiguous(first: usize, last: usize) -> Self {
        Self {
            positions: (first..=last).collect(),
        }
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn first(&self) -> Option<usize> {
        self.positions.first().copied()
    }

    pub fn last(&self) -> Option<usize> {
        self.positions.last().copied()
    }
}

/// Rows read from one sheet.
///
/// `columns` holds the header names in window order; each row holds one value
/// per header, so a row is the name → value mapping `columns[i] → row[i]`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetData {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Value of `column` in row `row`, if both exist
    pub fn get(&self, row: usize, column: &str) -> Option<&CellValue> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).and_then(|r| r.get(idx))
    }
}

/// Rows of one source file together with the file they came from
#[derive(Debug, Clone, PartialEq)]
pub struct FileRows {
    pub source: SourceFile,
    pub data: SheetData,
}
