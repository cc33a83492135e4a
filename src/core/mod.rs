pub mod consolidator;
pub mod pipeline;
pub mod ranking;

pub use consolidator::{consolidate, ConsolidatedDataset, ConsolidatedRow, Consolidator, SourceSummary};
pub use pipeline::{CancellationToken, NoProgress, Pipeline, PipelineOutput, Progress, ProgressObserver};
pub use ranking::{ColumnStat, RankAggregator, Ranking};
