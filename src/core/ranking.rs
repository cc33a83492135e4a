//! Top-N ranking of numeric column means

use crate::config::DEFAULT_TOP_N;
use crate::core::consolidator::ConsolidatedDataset;
use crate::types::CellValue;
use serde::Serialize;

/// Mean of one numeric column
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnStat {
    pub column: String,
    /// Arithmetic mean over the non-null values
    pub mean: f64,
    /// Number of non-null values averaged
    pub count: usize,
    /// This mean's fraction of the sum of ranked means (pie-chart slice)
    pub share: f64,
}

/// Column means sorted descending, at most `top_n` long
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Ranking {
    pub stats: Vec<ColumnStat>,
}

impl Ranking {
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    pub fn columns(&self) -> Vec<&str> {
        self.stats.iter().map(|s| s.column.as_str()).collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnStat> {
        self.stats.iter()
    }
}

/// Computes numeric column means and keeps the largest
#[derive(Debug, Clone, Copy)]
pub struct RankAggregator {
    top_n: usize,
}

impl Default for RankAggregator {
    fn default() -> Self {
        Self { top_n: DEFAULT_TOP_N }
    }
}

impl RankAggregator {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Means of every uniformly numeric column, in column discovery order.
    ///
    /// A column qualifies when each non-null value is a number cell and at
    /// least one value is present. Text and boolean cells disqualify it, so
    /// the ANIO/MES/DIA tags never qualify.
    pub fn column_means(&self, dataset: &ConsolidatedDataset) -> Vec<ColumnStat> {
        dataset
            .data_columns()
            .iter()
            .filter_map(|column| {
                numeric_mean(dataset.column_values(column)).map(|(mean, count)| ColumnStat {
                    column: column.clone(),
                    mean,
                    count,
                    share: 0.0,
                })
            })
            .collect()
    }

    /// The `top_n` largest means, descending; equal means keep discovery order
    pub fn rank(&self, dataset: &ConsolidatedDataset) -> Ranking {
        let mut stats = self.column_means(dataset);
        // sort_by is stable
        stats.sort_by(|a, b| b.mean.total_cmp(&a.mean));
        stats.truncate(self.top_n);

        let total: f64 = stats.iter().map(|s| s.mean).sum();
        if total != 0.0 {
            for stat in &mut stats {
                stat.share = stat.mean / total;
            }
        }

        Ranking { stats }
    }
}

/// `(mean, count)` of a column whose non-null values are all numbers
fn numeric_mean<'a>(values: impl Iterator<Item = &'a CellValue>) -> Option<(f64, usize)> {
    let mut sum = 0.0;
    let mut count = 0usize;

    for value in values {
        match value {
            CellValue::Null => {}
            CellValue::Number(n) => {
                sum += n;
                count += 1;
            }
            CellValue::Text(_) | CellValue::Bool(_) => return None,
        }
    }

    if count == 0 {
        None
    } else {
        Some((sum / count as f64, count))
    }
}
