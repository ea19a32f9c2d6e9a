use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info_span;
use wheelhouse_core::data::{load_bars_csv, load_volatility_csv, VolatilitySurface};
use wheelhouse_core::report::{
    write_diagnostics_jsonl, write_equity_csv, write_summary_json, write_trades_csv, SummaryMeta,
};
use wheelhouse_core::{analyze, benchmark_curve, Simulator, Strategy};

pub(super) fn run_backtest(config_path: PathBuf, out: Option<PathBuf>) -> Result<(), String> {
    let (config, config_toml) = crate::config::load_config_with_source(&config_path)?;
    let _span = info_span!(
        "run_backtest",
        run_id = %config.run.run_id,
        ticker = %config.run.ticker,
        strategy = %config.strategy.kind,
    )
    .entered();

    let overall_start = Instant::now();

    let load_start = Instant::now();
    let (bars, quality) = load_bars_csv(PathBuf::from(&config.paths.bars_csv).as_path())?;
    metrics::histogram!("wheelhouse.backtest.load_bars_ms")
        .record(load_start.elapsed().as_millis() as f64);
    tracing::info!(
        rows = quality.rows,
        first = ?quality.first_timestamp,
        last = ?quality.last_timestamp,
        "loaded price bars"
    );
    if quality.duplicates > 0 || quality.out_of_order > 0 || quality.invalid_close > 0 {
        tracing::warn!(
            duplicates = quality.duplicates,
            out_of_order = quality.out_of_order,
            invalid_close = quality.invalid_close,
            "price series has defects"
        );
    }

    let (benchmark_bars, bench_quality) =
        load_bars_csv(PathBuf::from(&config.paths.benchmark_csv).as_path())?;
    if bench_quality.duplicates > 0 || bench_quality.out_of_order > 0 {
        tracing::warn!(
            duplicates = bench_quality.duplicates,
            out_of_order = bench_quality.out_of_order,
            "benchmark series has defects"
        );
    }

    let surface = match &config.paths.volatility_csv {
        Some(path) => {
            let quotes = load_volatility_csv(PathBuf::from(path).as_path())?;
            tracing::info!(quotes = quotes.len(), "loaded implied-volatility quotes");
            Some(VolatilitySurface::new(quotes))
        }
        None => None,
    };

    let strategy = crate::config::build_strategy(&config)?;
    let strategy_name = strategy.name().to_string();

    let engine_start = Instant::now();
    let mut simulator = Simulator::new(bars.clone(), strategy, config.run.initial_cash);
    if let Some(surface) = surface {
        simulator = simulator.with_volatility(surface);
    }
    let output = simulator.run().map_err(|err| err.to_string())?;
    let engine_ms = engine_start.elapsed().as_millis() as f64;
    metrics::histogram!("wheelhouse.backtest.engine_ms").record(engine_ms);
    metrics::gauge!("wheelhouse.backtest.bars_processed").set(output.equity.len() as f64);
    metrics::gauge!("wheelhouse.backtest.trades").set(output.trades.len() as f64);

    let benchmark =
        benchmark_curve(&benchmark_bars, config.run.initial_cash).map_err(|err| err.to_string())?;
    let (report, align_diagnostics) =
        analyze(&output.equity, &benchmark, config.run.periods_per_year)
            .map_err(|err| err.to_string())?;

    let mut diagnostics = output.diagnostics;
    diagnostics.extend(align_diagnostics);
    if !diagnostics.is_empty() {
        tracing::warn!(count = diagnostics.len(), "run produced diagnostics");
    }

    let out_root = out.unwrap_or_else(|| PathBuf::from(&config.paths.out_dir));
    let run_dir = out_root.join(&config.run.run_id);
    fs::create_dir_all(&run_dir)
        .map_err(|err| format!("failed to create {}: {}", run_dir.display(), err))?;

    let meta = SummaryMeta {
        run_id: config.run.run_id.clone(),
        ticker: config.run.ticker.clone(),
        strategy: strategy_name,
        start: bars.first().map(|bar| bar.timestamp).unwrap_or_default(),
        end: bars.last().map(|bar| bar.timestamp).unwrap_or_default(),
    };
    write_equity_csv(run_dir.join("equity.csv").as_path(), &output.equity)?;
    write_equity_csv(run_dir.join("benchmark.csv").as_path(), &benchmark)?;
    write_trades_csv(run_dir.join("trades.csv").as_path(), &output.trades)?;
    write_summary_json(
        run_dir.join("summary.json").as_path(),
        &report,
        Some(&meta),
        &diagnostics,
    )?;
    write_diagnostics_jsonl(run_dir.join("diagnostics.jsonl").as_path(), &diagnostics)?;
    fs::write(run_dir.join("config_snapshot.toml"), &config_toml)
        .map_err(|err| format!("failed to write config snapshot: {err}"))?;

    println!("run output: {}", run_dir.display());
    println!(
        "total_return={:.4} annualized_return={:.4} volatility={:.4} sharpe={:.4}",
        report.total_return, report.annualized_return, report.volatility, report.sharpe_ratio
    );
    println!(
        "benchmark_total_return={:.4} benchmark_sharpe={:.4} trades={} diagnostics={}",
        report.benchmark_total_return,
        report.benchmark_sharpe_ratio,
        output.trades.len(),
        diagnostics.len()
    );
    println!(
        "wheelhouse cli: backtest total_ms={}",
        overall_start.elapsed().as_millis()
    );
    Ok(())
}
