mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::analyze::{AnalyzeArgs, BatchArgs, MetricsArgs};

/// Benford's Law conformity analysis
#[derive(Parser)]
#[command(
    name = "benford",
    version,
    about = "Benford's Law conformity analysis of numeric samples",
    long_about = "Tests whether a numeric sample follows Benford's first-digit law. \
                  Combines a Pearson chi-squared test with a Monte Carlo calibrated \
                  Hotelling Q test through Fisher's method, and reports delta, NED, \
                  MAD, zStat and Pearson discrepancy metrics."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the combined Benford test and discrepancy metrics on one sample
    Analyze(AnalyzeArgs),
    /// Compute discrepancy metrics only
    Metrics(MetricsArgs),
    /// Analyse several inputs and emit one report row per input
    Batch(BatchArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn main() {
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Analyze(args) => commands::analyze::run_analyze(args),
        Commands::Metrics(args) => commands::analyze::run_metrics(args),
        Commands::Batch(args) => commands::analyze::run_batch(args),
        Commands::Version => {
            println!("benford {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
