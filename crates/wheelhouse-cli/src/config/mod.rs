use serde::Deserialize;
use std::fs;
use std::path::Path;
use wheelhouse_core::{CoveredCall, SmaCrossover, StrategyKind};

#[derive(Debug, Deserialize)]
pub struct Config {
    pub run: RunConfig,
    pub paths: PathsConfig,
    pub strategy: StrategyConfig,
}

#[derive(Debug, Deserialize)]
pub struct RunConfig {
    pub run_id: String,
    pub ticker: String,
    pub initial_cash: f64,
    pub periods_per_year: f64,
}

#[derive(Debug, Deserialize)]
pub struct PathsConfig {
    pub bars_csv: String,
    pub benchmark_csv: String,
    pub volatility_csv: Option<String>,
    pub out_dir: String,
}

#[derive(Debug, Deserialize)]
pub struct StrategyConfig {
    pub kind: String,
    // sma_crossover
    pub fast_window: Option<usize>,
    pub slow_window: Option<usize>,
    pub position_size: Option<u64>,
    // covered_call
    pub strike_offset_pct: Option<f64>,
    pub contract_period_days: Option<u32>,
    pub risk_free_rate: Option<f64>,
    pub vol_lookback: Option<usize>,
}

pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    Ok((config, contents))
}

/// Maps the `[strategy]` table onto a strategy variant. Parameter validation
/// itself lives in the engine constructors; this only fills defaults.
pub fn build_strategy(config: &Config) -> Result<StrategyKind, String> {
    let strategy = &config.strategy;
    match strategy.kind.trim().to_lowercase().as_str() {
        "sma_crossover" | "sma" => {
            let fast = strategy.fast_window.unwrap_or(40);
            let slow = strategy.slow_window.unwrap_or(100);
            let size = strategy.position_size.unwrap_or(100);
            SmaCrossover::new(fast, slow, size)
                .map(StrategyKind::SmaCrossover)
                .map_err(|err| err.to_string())
        }
        "covered_call" => {
            let offset = strategy.strike_offset_pct.unwrap_or(0.05);
            let days = strategy.contract_period_days.unwrap_or(7);
            let rate = strategy.risk_free_rate.unwrap_or(0.02);
            let lookback = strategy.vol_lookback.unwrap_or(20);
            CoveredCall::new(offset, days, rate, lookback, config.run.periods_per_year)
                .map(StrategyKind::CoveredCall)
                .map_err(|err| err.to_string())
        }
        other => Err(format!(
            "strategy.kind must be: sma_crossover | covered_call, got {other:?}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::{build_strategy, load_config_with_source, Config};
    use std::path::Path;
    use wheelhouse_core::StrategyKind;

    fn parse_config(toml_str: &str) -> Config {
        toml::from_str(toml_str).expect("config should parse")
    }

    const SAMPLE: &str = r#"
[run]
run_id = "aapl_cc_2020"
ticker = "AAPL"
initial_cash = 10000.0
periods_per_year = 52.0

[paths]
bars_csv = "data/aapl_weekly.csv"
benchmark_csv = "data/gspc_weekly.csv"
volatility_csv = "data/aapl_iv.csv"
out_dir = "runs/"

[strategy]
kind = "covered_call"
strike_offset_pct = 0.05
contract_period_days = 7
risk_free_rate = 0.02
vol_lookback = 20
"#;

    #[test]
    fn parse_covered_call_config() {
        let config = parse_config(SAMPLE);
        assert_eq!(config.run.ticker, "AAPL");
        assert_eq!(config.strategy.kind, "covered_call");
        let strategy = build_strategy(&config).expect("strategy should build");
        assert!(matches!(strategy, StrategyKind::CoveredCall(_)));
    }

    #[test]
    fn parse_sma_config_with_defaults() {
        let toml_str = r#"
[run]
run_id = "aapl_sma"
ticker = "AAPL"
initial_cash = 10000.0
periods_per_year = 252.0

[paths]
bars_csv = "data/aapl_daily.csv"
benchmark_csv = "data/gspc_daily.csv"
out_dir = "runs/"

[strategy]
kind = "sma_crossover"
"#;
        let config = parse_config(toml_str);
        let strategy = build_strategy(&config).expect("strategy should build");
        assert!(matches!(strategy, StrategyKind::SmaCrossover(_)));
    }

    #[test]
    fn invalid_strategy_params_fail_before_running() {
        let toml_str = r#"
[run]
run_id = "bad"
ticker = "AAPL"
initial_cash = 10000.0
periods_per_year = 252.0

[paths]
bars_csv = "data/a.csv"
benchmark_csv = "data/b.csv"
out_dir = "runs/"

[strategy]
kind = "sma_crossover"
fast_window = 100
slow_window = 40
"#;
        let config = parse_config(toml_str);
        let err = build_strategy(&config).expect_err("windows are inverted");
        assert!(err.contains("slow_window"));
    }

    #[test]
    fn load_config_missing_file_returns_error() {
        let path = Path::new("/tmp/wheelhouse-missing-config.toml");
        let err = load_config_with_source(path).expect_err("expected load to fail");
        assert!(err.contains("failed to read config"));
    }
}
