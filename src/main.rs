use clap::{Parser, Subcommand};
use ventas_etl::cli::{self, RunArgs};

#[derive(Parser)]
#[command(name = "ventas-etl")]
#[command(about = "Consolidate dated AvanceVentasINTI extracts into one workbook")]
#[command(long_about = "Ventas ETL - consolidate daily sales extracts

Reads every AvanceVentasINTI.<year>.<month>.<day>.xlsx file in a directory,
takes the chosen columns of sheet ITEM_O starting at the header row, tags each
row with ANIO/MES/DIA from its file name, and writes everything to Out.xlsx in
the same directory. The numeric columns with the largest averages are ranked.

COMMANDS:
  run     - Consolidate once
  watch   - Consolidate again whenever an extract changes

EXAMPLES:
  ventas-etl run ./extracts --columns A:D --start-row 3
  ventas-etl run ./extracts -c B:F -s 2 --workers 4 --chart ranking.xlsx
  ventas-etl watch ./extracts -c A:D

Set RUST_LOG=ventas_etl=debug for detailed logs.")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Consolidate every extract in a directory
    Run(RunArgs),

    /// Watch a directory and consolidate on every change
    Watch(RunArgs),
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose {
        "ventas_etl=info"
    } else {
        "ventas_etl=warn"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => {
            init_tracing(args.verbose);
            cli::run(args)?;
        }
        Commands::Watch(args) => {
            init_tracing(args.verbose);
            cli::watch(args)?;
        }
    }

    Ok(())
}
