use crate::config::{EtlConfig, PipelineParams};
use crate::core::{ColumnStat, NoProgress, Pipeline, PipelineOutput, Progress, Ranking};
use crate::error::{EtlError, EtlResult};
use clap::Args;
use colored::Colorize;
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebouncedEvent};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

/// Arguments shared by `run` and `watch`
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Directory holding the AvanceVentasINTI.<year>.<month>.<day>.xlsx extracts
    pub directory: PathBuf,

    /// Column range to read, e.g. A:D
    #[arg(short, long)]
    pub columns: String,

    /// Row number (1-based) of the header row
    #[arg(short, long, default_value_t = 1)]
    pub start_row: usize,

    /// YAML configuration file
    #[arg(long, env = "VENTAS_ETL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Read files on this many worker threads
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Number of columns in the ranking
    #[arg(short, long)]
    pub top: Option<usize>,

    /// Sheet to read from every extract
    #[arg(long)]
    pub sheet: Option<String>,

    /// File name prefix of the extracts
    #[arg(long)]
    pub prefix: Option<String>,

    /// Output file name, written inside the input directory
    #[arg(short, long)]
    pub output: Option<String>,

    /// Also write the ranking with bar and pie charts to this workbook
    #[arg(long)]
    pub chart: Option<PathBuf>,

    /// Reject file names whose date is not a calendar date
    #[arg(long)]
    pub strict_dates: bool,

    /// Print the run summary as JSON
    #[arg(long)]
    pub json: bool,

    /// Show verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

/// Format a number for display, removing unnecessary decimal places
fn format_number(n: f64) -> String {
    let rounded = (n * 1e2).round() / 1e2;
    format!("{:.2}", rounded)
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// Config file (or defaults) with command-line overrides applied
fn resolve_config(args: &RunArgs) -> EtlResult<EtlConfig> {
    let mut config = match &args.config {
        Some(path) => EtlConfig::load(path)?,
        None => EtlConfig::default(),
    };

    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(top) = args.top {
        config.top_n = top;
    }
    if let Some(ref sheet) = args.sheet {
        config.sheet_name = sheet.clone();
    }
    if let Some(ref prefix) = args.prefix {
        config.file_prefix = prefix.clone();
    }
    if let Some(ref output) = args.output {
        config.output_file_name = output.clone();
    }
    if args.strict_dates {
        config.strict_dates = true;
    }

    config.validate()?;
    Ok(config)
}

fn print_progress(progress: &Progress) {
    println!(
        "   [{}/{}] {:>5.1}%  {}",
        progress.processed,
        progress.total,
        progress.fraction() * 100.0,
        progress.file_name.cyan()
    );
}

/// Execute the run command
pub fn run(args: RunArgs) -> EtlResult<()> {
    let config = resolve_config(&args)?;
    let params = PipelineParams::from_start_row(&args.directory, &args.columns, args.start_row)?;

    if args.json {
        let output = pipeline(config, &args)?.run(&params, &NoProgress)?;
        print_json(&output)?;
        return Ok(());
    }

    println!("{}", "📊 Ventas ETL - Consolidating extracts".bold().green());
    println!("   Directory: {}", args.directory.display());
    println!("   Columns:   {}", args.columns);
    println!("   Header row: {}", args.start_row);
    if args.verbose {
        println!("   Sheet:     {}", config.sheet_name);
        println!("   Prefix:    {}", config.file_prefix);
        println!("   Workers:   {}", config.workers);
    }
    println!();

    let output = run_once(&config, &params, &args)?;
    print_summary(&output, &args);
    Ok(())
}

/// Pipeline for `config`, writing the chart workbook when one was asked for
fn pipeline(config: EtlConfig, args: &RunArgs) -> EtlResult<Pipeline> {
    let pipeline = Pipeline::new(config)?;
    Ok(match args.chart {
        Some(ref path) => pipeline.with_chart(path),
        None => pipeline,
    })
}

fn run_once(config: &EtlConfig, params: &PipelineParams, args: &RunArgs) -> EtlResult<PipelineOutput> {
    pipeline(config.clone(), args)?.run(params, &print_progress)
}

#[derive(Serialize)]
struct RunSummary<'a> {
    output: String,
    files: Vec<String>,
    rows: usize,
    columns: Vec<&'a str>,
    ranking: &'a [ColumnStat],
}

fn run_summary(output: &PipelineOutput) -> RunSummary<'_> {
    RunSummary {
        output: output.output_path.display().to_string(),
        files: output.files.iter().map(|f| f.file_name()).collect(),
        rows: output.dataset.len(),
        columns: output.dataset.columns(),
        ranking: &output.ranking.stats,
    }
}

fn print_json(output: &PipelineOutput) -> EtlResult<()> {
    let json = serde_json::to_string_pretty(&run_summary(output))
        .map_err(|e| EtlError::Config(format!("Cannot serialize summary: {}", e)))?;
    println!("{}", json);
    Ok(())
}

fn print_summary(output: &PipelineOutput, args: &RunArgs) {
    println!();
    println!("{}", "✅ Consolidation complete".bold().green());
    println!(
        "   {} files, {} rows, {} columns",
        output.files.len(),
        output.dataset.len(),
        output.dataset.column_count()
    );

    if args.verbose {
        for source in output.dataset.sources() {
            println!(
                "   {} {} ({} rows)",
                "•".cyan(),
                source.file_name,
                source.rows
            );
        }
    }

    print_ranking_table(&output.ranking);
    println!();
    println!("   Output: {}", output.output_path.display().to_string().bold());
    if let Some(ref chart) = args.chart {
        println!("   Charts: {}", chart.display());
    }
}

fn print_ranking_table(ranking: &Ranking) {
    println!("\n{}", "🏆 Top column averages:".bold().cyan());

    if ranking.is_empty() {
        println!("   {}", "No numeric columns to rank".yellow());
        return;
    }

    println!("{}", "─".repeat(60));
    println!(
        "{:>3}  {:<30} {:>14} {:>8}",
        "#".bold(),
        "Column".bold(),
        "Average".bold(),
        "Share".bold()
    );
    println!("{}", "─".repeat(60));

    for (idx, stat) in ranking.iter().enumerate() {
        println!(
            "{:>3}  {:<30} {:>14} {:>7.1}%",
            idx + 1,
            stat.column.bright_blue(),
            format_number(stat.mean),
            stat.share * 100.0
        );
    }

    println!("{}", "─".repeat(60));
}

/// Execute the watch command: run now, then again whenever an extract changes
pub fn watch(args: RunArgs) -> EtlResult<()> {
    let config = resolve_config(&args)?;
    let params = PipelineParams::from_start_row(&args.directory, &args.columns, args.start_row)?;

    println!("{}", "👁️  Ventas ETL - Watch Mode".bold().green());
    println!("   Watching: {}", args.directory.display());
    println!("   Press {} to stop\n", "Ctrl+C".bold().yellow());

    if !args.directory.is_dir() {
        return Err(EtlError::Config(format!(
            "Directory not found: {}",
            args.directory.display()
        )));
    }

    let (tx, rx) = channel();

    // Debounce so a file being copied in triggers one run
    let mut debouncer = new_debouncer(Duration::from_millis(500), tx)
        .map_err(|e| EtlError::Config(format!("Failed to create file watcher: {}", e)))?;

    debouncer
        .watcher()
        .watch(&args.directory, RecursiveMode::NonRecursive)
        .map_err(|e| EtlError::Config(format!("Failed to watch directory: {}", e)))?;

    println!("{}", "🔄 Initial run...".cyan());
    run_watch_action(&config, &params, &args);
    println!();

    loop {
        match rx.recv() {
            Ok(Ok(events)) => {
                if has_relevant_event(&events, &config) {
                    println!(
                        "\n{} {}",
                        "🔄 Change detected at".cyan(),
                        chrono::Local::now().format("%H:%M:%S").to_string().cyan()
                    );
                    run_watch_action(&config, &params, &args);
                    println!();
                }
            }
            Ok(Err(error)) => {
                eprintln!("{} Watch error: {}", "❌".red(), error);
            }
            Err(e) => {
                eprintln!("{} Channel error: {}", "❌".red(), e);
                break;
            }
        }
    }

    Ok(())
}

/// Only extracts count; our own output and temp files never retrigger a run
fn is_relevant_path(path: &Path, config: &EtlConfig) -> bool {
    match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name != config.output_file_name && config.matches_source(name),
        None => false,
    }
}

fn has_relevant_event(events: &[DebouncedEvent], config: &EtlConfig) -> bool {
    events
        .iter()
        .any(|event| is_relevant_path(&event.path, config))
}

fn run_watch_action(config: &EtlConfig, params: &PipelineParams, args: &RunArgs) {
    match run_once(config, params, args) {
        Ok(output) => print_summary(&output, args),
        Err(e) => {
            eprintln!("{} {}: {}", "❌".red(), e.kind().red().bold(), e);
        }
    }
}

#[cfg(test)]
#[path = "commands_tests.rs"]
mod tests;
