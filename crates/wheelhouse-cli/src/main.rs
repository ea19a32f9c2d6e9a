mod commands;
mod config;
mod obs;

use clap::{Parser, Subcommand};
use commands::Command;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "wheelhouse")]
#[command(about = "Wheelhouse backtesting CLI", version, arg_required_else_help = true)]
#[command(
    after_help = "Examples:\n  wheelhouse backtest --config configs/covered_call.toml --out runs/\n  wheelhouse report --input runs/<run_id>/\n"
)]
struct Cli {
    /// Log level filter (overridden by WHEELHOUSE_LOG).
    #[arg(long, default_value = "info")]
    log_level: String,
    /// Log output format: text | json.
    #[arg(long, default_value = "text")]
    log_format: String,
    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    Backtest {
        #[arg(long)]
        config: PathBuf,
        #[arg(long)]
        out: Option<PathBuf>,
    },
    Report {
        #[arg(long)]
        input: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(err) = obs::init_tracing(&cli.log_level, &cli.log_format) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    let command = match cli.command {
        CliCommand::Backtest { config, out } => Command::Backtest { config, out },
        CliCommand::Report { input } => Command::Report { input },
    };

    if let Err(err) = commands::run(command) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
