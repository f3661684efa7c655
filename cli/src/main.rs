//! opfuzz CLI: list harnesses, replay corpus inputs, inspect bug reports

mod commands;

use anyhow::Result;
use clap::CommandFactory;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use commands::{collect_inputs, list_harnesses, lookup, print_report, recheck_report, replay};

#[derive(Parser)]
#[command(
    name = "opfuzz",
    version,
    about = "opfuzz CLI: replay fuzz inputs against tensor operator harnesses",
    long_about = "opfuzz CLI replays byte-stream inputs through the bundled operator harnesses.\n\nEach input is decoded into a tensor case and executed once. Inputs that end in a bug can be saved as CBOR reports for later triage.",
    author,
    propagate_version = true
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List the bundled harnesses
    #[command(
        about = "List the bundled harnesses and their minimum input sizes.",
        long_about = "List every registered harness with the minimum number of bytes it needs before decoding.\n\nExample:\n  opfuzz list\n"
    )]
    List,
    /// Replay input files through a harness
    #[command(
        about = "Replay input files or corpus directories through a harness.",
        long_about = "Replay input files through a harness and print one row per input.\n\nDirectories are expanded one level deep. Exits with status 1 if any input ends in a bug.\n\nExamples:\n  opfuzz run max_pool crash-1234\n  opfuzz run nanquantile corpus/ --artifacts reports/\n"
    )]
    Run {
        /// Harness name
        #[arg(help = "Name of the harness (see `opfuzz list`)")]
        harness: String,
        /// Input files or directories
        #[arg(help = "Input files or corpus directories", required = true)]
        inputs: Vec<PathBuf>,
        /// Directory for bug reports
        #[arg(
            long,
            env = "OPFUZZ_ARTIFACTS",
            value_name = "DIR",
            help = "Write a CBOR bug report into DIR for every input that ends in a bug"
        )]
        artifacts: Option<PathBuf>,
        /// Only print bugs
        #[arg(long, short, help = "Only print rows for inputs that ended in a bug")]
        quiet: bool,
    },
    /// Show a saved bug report
    #[command(
        about = "Show a saved bug report.",
        long_about = "Print the fields of a CBOR bug report.\n\nWith --recheck the stored input is replayed against its harness.\n\nExample:\n  opfuzz show reports/crash-matmul-0badf00d.cbor --recheck\n"
    )]
    Show {
        /// Report file
        #[arg(help = "Path to the .cbor report")]
        report: PathBuf,
        /// Replay the stored input
        #[arg(long, help = "Replay the stored input and print the outcome")]
        recheck: bool,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<ExitCode> {
    init_logging();
    let cli = Cli::parse();

    match &cli.command {
        Some(Commands::List) => list_harnesses(),
        Some(Commands::Run { harness, inputs, artifacts, quiet }) => {
            let entry = lookup(harness)?;
            let inputs = collect_inputs(inputs)?;
            let summary = replay(entry, &inputs, artifacts.as_deref(), *quiet)?;
            println!(
                "{} input(s): {} continued, {} rejected, {} bug(s)",
                summary.total(),
                summary.continued,
                summary.rejected,
                summary.bugs
            );
            for path in &summary.reports {
                println!("Report written to {}", path.display());
            }
            if summary.bugs > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
        Some(Commands::Show { report, recheck }) => {
            let report = print_report(report)?;
            if *recheck {
                let outcome = recheck_report(&report)?;
                println!("Recheck: {}", outcome.label());
                if let opfuzz::Outcome::BugFound(message) = &outcome {
                    println!("{}", message);
                }
            }
        }
        None => {
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(ExitCode::SUCCESS)
}
