mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;

use lease_projection_core::ProjectionError;

use commands::batch::BatchArgs;
use commands::capex_schedule::CapexScheduleArgs;
use commands::fingerprint::FingerprintArgs;
use commands::project::ProjectArgs;
use commands::ratios::RatiosArgs;
use commands::rent_schedule::RentScheduleArgs;

/// Multi-period lease projections for school operating proposals
#[derive(Parser)]
#[command(
    name = "lpx",
    version,
    about = "Multi-period lease projections with decimal precision",
    long_about = "A CLI for projecting school lease proposals year by year: historical \
                  pass-through, transition years and the contract window, with rent \
                  models, capex and depreciation, working capital, and circular \
                  interest resolution. Reports NPV, IRR and annualized value."
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
    /// Run a full projection for one proposal
    Project(ProjectArgs),
    /// Project several proposals in parallel
    Batch(BatchArgs),
    /// Resolve working-capital ratios from the historical base year
    Ratios(RatiosArgs),
    /// Preview rent over the contract window
    RentSchedule(RentScheduleArgs),
    /// Preview capex and depreciation
    CapexSchedule(CapexScheduleArgs),
    /// Print the cache fingerprint of an input
    Fingerprint(FingerprintArgs),
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
    env_logger::init();
    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Project(args) => commands::project::run_project(args),
        Commands::Batch(args) => commands::batch::run_batch_command(args),
        Commands::Ratios(args) => commands::ratios::run_ratios(args),
        Commands::RentSchedule(args) => commands::rent_schedule::run_rent_schedule(args),
        Commands::CapexSchedule(args) => commands::capex_schedule::run_capex_schedule(args),
        Commands::Fingerprint(args) => commands::fingerprint::run_fingerprint(args),
        Commands::Version => {
            println!("lpx {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => match e.downcast_ref::<ProjectionError>() {
            Some(pe) => {
                eprintln!("{}: {}", format!("error[{}]", pe.code()).red().bold(), pe);
                process::exit(exit_code(pe));
            }
            None => {
                eprintln!("{}: {}", "error".red().bold(), e);
                process::exit(1);
            }
        },
    }
}

/// 2 for non-convergence, 3 for timeouts, 1 for everything else.
fn exit_code(e: &ProjectionError) -> i32 {
    if e.is_convergence() {
        2
    } else if e.is_timeout() {
        3
    } else {
        1
    }
}
