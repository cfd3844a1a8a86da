// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// receiptscan: locate photographed receipts, flatten them and binarize them.
//
// Entry point. Parses the command line, initialises logging, loads the
// configuration and dispatches to a command.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "receiptscan")]
#[command(about = "Locate, flatten and binarize photographed receipts")]
#[command(version)]
struct Cli {
    /// YAML configuration file; built-in defaults are used when omitted.
    #[arg(short, long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Scan every image in the input directory into the output directory.
    Run {
        /// Override `paths.input_dir`.
        #[arg(long, value_name = "DIR")]
        input: Option<PathBuf>,
        /// Override `paths.output_dir`.
        #[arg(long, value_name = "DIR")]
        output: Option<PathBuf>,
        /// Override `batch.workers` (0 = one per CPU).
        #[arg(long, value_name = "N")]
        workers: Option<usize>,
        /// Write the batch report as JSON.
        #[arg(long, value_name = "FILE")]
        report: Option<PathBuf>,
    },
    /// Scan a single image.
    Scan {
        input: PathBuf,
        output: PathBuf,
    },
    /// Write the default configuration as YAML.
    InitConfig {
        #[arg(default_value = "receiptscan.yml")]
        path: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "receiptscan starting");

    match cli.command {
        Command::Run {
            input,
            output,
            workers,
            report,
        } => {
            let mut config = commands::load_config(cli.config.as_deref())?;
            commands::apply_overrides(&mut config, input, output, workers);
            commands::run_batch(&config, report.as_deref())
        }
        Command::Scan { input, output } => {
            let config = commands::load_config(cli.config.as_deref())?;
            commands::scan_single(&config, &input, &output)
        }
        Command::InitConfig { path } => commands::init_config(&path),
    }
}
