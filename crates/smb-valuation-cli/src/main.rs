mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use commands::config::CheckConfigArgs;
use commands::normalize::NormalizeArgs;
use commands::scan::ScanArgs;
use commands::sectors::SectorsArgs;
use commands::valuate::ValuateArgs;

/// Private-company valuation from financial statements
#[derive(Parser)]
#[command(
    name = "smbv",
    version,
    about = "Private-company valuation from financial statements",
    long_about = "Values a privately-held company from one to three years of financial \
                  statements: sector-weighted multiples, DCF and asset methods, EBITDA \
                  normalization, discount/premium stacking, anomaly scan and a confidence \
                  grade. Input is JSON or YAML, from a file or stdin."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration file (.yaml, .yml or .json); the embedded defaults otherwise
    #[arg(long, global = true)]
    config: Option<String>,

    /// Log engine decisions to stderr (RUST_LOG overrides)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Value a company end to end
    Valuate(ValuateArgs),
    /// Normalize the latest year's EBITDA
    Normalize(NormalizeArgs),
    /// Scan statements for anomalies and grade input confidence
    Scan(ScanArgs),
    /// List sector profiles or resolve a sector code
    Sectors(SectorsArgs),
    /// Validate an engine configuration file
    CheckConfig(CheckConfigArgs),
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

fn init_tracing(verbose: bool) {
    let default = if verbose { "smb_valuation_core=debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default)),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = cli.config.as_deref();
    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Valuate(args) => commands::valuate::run_valuate(args, config),
        Commands::Normalize(args) => commands::normalize::run_normalize(args, config),
        Commands::Scan(args) => commands::scan::run_scan(args, config),
        Commands::Sectors(args) => commands::sectors::run_sectors(args, config),
        Commands::CheckConfig(args) => commands::config::run_check_config(args, config),
        Commands::Version => {
            println!("smbv {}", env!("CARGO_PKG_VERSION"));
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
