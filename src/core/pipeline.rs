//! Discovery → read → consolidate → rank → export

use crate::columns::parse_column_range;
use crate::config::{EtlConfig, PipelineParams};
use crate::core::consolidator::{ConsolidatedDataset, Consolidator};
use crate::core::ranking::{RankAggregator, Ranking};
use crate::error::{EtlError, EtlResult};
use crate::excel::{DatasetExporter, RankingChartExporter, SheetReader};
use crate::filename::{extract_calendar_date, extract_file_date};
use crate::types::{FileRows, SourceFile};
use rayon::prelude::*;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

//==============================================================================
// Progress and cancellation
//==============================================================================

/// Emitted once per file read
#[derive(Debug, Clone, PartialEq)]
pub struct Progress {
    pub processed: usize,
    pub total: usize,
    /// File that just finished
    pub file_name: String,
}

impl Progress {
    /// Completed fraction in `[0, 1]`
    pub fn fraction(&self) -> f64 {
        if self.total == 0 {
            1.0
        } else {
            self.processed as f64 / self.total as f64
        }
    }
}

/// Receives progress while a run is in flight.
///
/// With parallel reads notifications come from worker threads, but they are
/// serialized and `processed` never decreases.
pub trait ProgressObserver: Send + Sync {
    fn on_progress(&self, progress: &Progress);
}

impl<F> ProgressObserver for F
where
    F: Fn(&Progress) + Send + Sync,
{
    fn on_progress(&self, progress: &Progress) {
        self(progress)
    }
}

/// Observer that ignores progress
pub struct NoProgress;

impl ProgressObserver for NoProgress {
    fn on_progress(&self, _progress: &Progress) {}
}

/// Shared flag checked before each file is read
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

//==============================================================================
// Pipeline
//==============================================================================

/// Everything a successful run produces
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub files: Vec<SourceFile>,
    pub dataset: ConsolidatedDataset,
    pub ranking: Ranking,
    pub output_path: PathBuf,
}

/// Runs the consolidation over one directory. Holds no per-run state.
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: EtlConfig,
    cancel: CancellationToken,
    chart_path: Option<PathBuf>,
}

impl Pipeline {
    pub fn new(config: EtlConfig) -> EtlResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            cancel: CancellationToken::new(),
            chart_path: None,
        })
    }

    /// Also write the ranking chart workbook to `path`, before the dataset
    pub fn with_chart(mut self, path: impl Into<PathBuf>) -> Self {
        self.chart_path = Some(path.into());
        self
    }

    /// Use `token` to stop runs between files
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    /// Matching extracts in `directory`, sorted by file name, dates extracted
    #[instrument(level = "debug", skip(self, directory), fields(dir = %directory.display()))]
    pub fn discover(&self, directory: &Path) -> EtlResult<Vec<SourceFile>> {
        let no_input = || EtlError::NoInput {
            directory: directory.to_path_buf(),
            prefix: self.config.file_prefix.clone(),
            extension: self.config.file_extension.clone(),
        };

        let entries = match fs::read_dir(directory) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(no_input()),
            Err(e) => return Err(e.into()),
        };

        let mut names: Vec<String> = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if !self.config.matches_source(&name) {
                continue;
            }
            // Our own output can share the extract prefix
            if name == self.config.output_file_name {
                debug!(name = %name, "skipping previous output");
                continue;
            }
            if !entry.path().is_file() {
                debug!(name = %name, "skipping non-file entry");
                continue;
            }
            names.push(name);
        }

        if names.is_empty() {
            return Err(no_input());
        }

        names.sort();

        names
            .into_iter()
            .enumerate()
            .map(|(index, name)| {
                let date = if self.config.strict_dates {
                    extract_calendar_date(&name)?
                } else {
                    extract_file_date(&name)?
                };
                Ok(SourceFile::new(directory.join(&name), index, date))
            })
            .collect()
    }

    /// Discover, read and merge, without ranking or writing anything
    #[instrument(level = "info", skip(self, params, observer), fields(dir = %params.directory.display()))]
    pub fn consolidate(
        &self,
        params: &PipelineParams,
        observer: &dyn ProgressObserver,
    ) -> EtlResult<(Vec<SourceFile>, ConsolidatedDataset)> {
        let window = parse_column_range(&params.column_range)?;
        let files = self.discover(&params.directory)?;
        let reader = SheetReader::new(self.config.sheet_name.clone(), window, params.skip_rows);

        info!(files = files.len(), workers = self.config.workers, "reading extracts");

        let dataset = if self.config.workers > 1 && files.len() > 1 {
            self.read_parallel(&files, &reader, observer)?
        } else {
            self.read_sequential(&files, &reader, observer)?
        };

        Ok((files, dataset))
    }

    /// Full run: consolidate, rank, then write `<dir>/<output_file_name>`.
    ///
    /// A chart workbook, when requested, is written first so that a chart
    /// failure leaves no output dataset behind.
    pub fn run(
        &self,
        params: &PipelineParams,
        observer: &dyn ProgressObserver,
    ) -> EtlResult<PipelineOutput> {
        let start = Instant::now();
        let (files, dataset) = self.consolidate(params, observer)?;

        let ranking = RankAggregator::new(self.config.top_n).rank(&dataset);

        if let Some(ref chart_path) = self.chart_path {
            RankingChartExporter::new(&ranking).export(chart_path)?;
        }

        let output_path = params.output_path(&self.config);
        DatasetExporter::new(&dataset)
            .with_retries(self.config.export_retries)
            .export(&output_path)?;

        info!(
            rows = dataset.len(),
            columns = dataset.column_count(),
            ranked = ranking.len(),
            output = %output_path.display(),
            "completed in {:?}",
            start.elapsed()
        );

        Ok(PipelineOutput {
            files,
            dataset,
            ranking,
            output_path,
        })
    }

    fn read_sequential(
        &self,
        files: &[SourceFile],
        reader: &SheetReader,
        observer: &dyn ProgressObserver,
    ) -> EtlResult<ConsolidatedDataset> {
        let total = files.len();
        let mut consolidator = Consolidator::new();

        for (processed, file) in files.iter().enumerate() {
            if self.cancel.is_cancelled() {
                warn!(processed, total, "run cancelled");
                return Err(EtlError::Cancelled { processed, total });
            }

            let data = reader.read(&file.path)?;
            consolidator.push(FileRows {
                source: file.clone(),
                data,
            });

            debug!(rows = consolidator.rows_so_far(), "consolidated so far");
            observer.on_progress(&Progress {
                processed: processed + 1,
                total,
                file_name: file.file_name(),
            });
        }

        Ok(consolidator.finish())
    }

    /// Read on a bounded pool, then merge in discovery order.
    ///
    /// After the first failure or a cancellation, files not yet started are
    /// skipped. The reported error is the one with the lowest discovery index.
    fn read_parallel(
        &self,
        files: &[SourceFile],
        reader: &SheetReader,
        observer: &dyn ProgressObserver,
    ) -> EtlResult<ConsolidatedDataset> {
        let total = files.len();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.workers)
            .build()
            .map_err(|e| EtlError::Config(format!("Cannot start worker pool: {}", e)))?;

        let failed = AtomicBool::new(false);
        let completed = Mutex::new(0usize);

        let results: Vec<Option<EtlResult<FileRows>>> = pool.install(|| {
            files
                .par_iter()
                .map(|file| {
                    if failed.load(Ordering::SeqCst) || self.cancel.is_cancelled() {
                        return None;
                    }

                    let result = reader.read(&file.path).map(|data| FileRows {
                        source: file.clone(),
                        data,
                    });

                    if result.is_ok() {
                        let mut done = completed.lock().unwrap_or_else(|e| e.into_inner());
                        *done += 1;
                        observer.on_progress(&Progress {
                            processed: *done,
                            total,
                            file_name: file.file_name(),
                        });
                    } else {
                        failed.store(true, Ordering::SeqCst);
                    }

                    Some(result)
                })
                .collect()
        });

        let mut read = Vec::with_capacity(total);
        let mut skipped = false;
        for result in results {
            match result {
                Some(Ok(rows)) => read.push(rows),
                Some(Err(e)) => return Err(e),
                None => skipped = true,
            }
        }

        if skipped {
            let processed = read.len();
            warn!(processed, total, "run cancelled");
            return Err(EtlError::Cancelled { processed, total });
        }

        let mut consolidator = Consolidator::new();
        for rows in read {
            consolidator.push(rows);
        }
        Ok(consolidator.finish())
    }
}
