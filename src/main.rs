use anyhow::Result;
use chrono::NaiveDate;
use clap::{CommandFactory, Parser, Subcommand};
use folioview::cli::setup::{setup, setup_at_path};
use folioview::core::log::init_logging;
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    /// Path to the portfolio file, overriding the configuration
    #[arg(short, long, global = true)]
    portfolio: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Args)]
struct DateRange {
    /// First day to value (YYYY-MM-DD), defaults to the earliest purchase
    #[arg(long)]
    from: Option<NaiveDate>,

    /// Last day to value (YYYY-MM-DD), defaults to today
    #[arg(long)]
    to: Option<NaiveDate>,
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Drop all cached prices and rates
    Clear,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration and an example portfolio
    Setup,
    /// Display the portfolio value over time
    Value {
        #[command(flatten)]
        range: DateRange,

        /// Show every N-th day (the last day is always shown)
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u64).range(1..))]
        step: u64,
    },
    /// Display a per-holding summary
    Holdings {
        #[command(flatten)]
        range: DateRange,
    },
    /// Write the full valuation as JSON
    Export {
        #[command(flatten)]
        range: DateRange,

        /// Destination file
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Manage the response cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

impl From<Commands> for folioview::AppCommand {
    fn from(cmd: Commands) -> folioview::AppCommand {
        match cmd {
            Commands::Value { range, step } => folioview::AppCommand::Value {
                from: range.from,
                to: range.to,
                step: usize::try_from(step).unwrap_or(usize::MAX),
            },
            Commands::Holdings { range } => folioview::AppCommand::Holdings {
                from: range.from,
                to: range.to,
            },
            Commands::Export { range, output } => folioview::AppCommand::Export {
                from: range.from,
                to: range.to,
                output,
            },
            Commands::Cache {
                command: CacheCommands::Clear,
            } => folioview::AppCommand::ClearCache,
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let result = match cli.command {
        Some(Commands::Setup) => match cli.config_path.as_deref() {
            Some(path) => setup_at_path(path),
            None => setup(),
        },
        Some(cmd) => {
            folioview::run_command(
                cmd.into(),
                cli.config_path.as_deref(),
                cli.portfolio.as_deref(),
            )
            .await
        }
        None => {
            Cli::command().print_help()?;
            Ok(())
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Application failed");
    }
    result
}
