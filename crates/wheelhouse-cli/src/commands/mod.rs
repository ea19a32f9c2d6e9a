mod backtest;
mod report;

use std::path::PathBuf;

pub enum Command {
    Backtest { config: PathBuf, out: Option<PathBuf> },
    Report { input: PathBuf },
}

pub fn run(command: Command) -> Result<(), String> {
    match command {
        Command::Backtest { config, out } => backtest::run_backtest(config, out),
        Command::Report { input } => report::run_report(input),
    }
}
