use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info_span;
use wheelhouse_core::analyze;
use wheelhouse_core::report::read_equity_csv;

pub(super) fn run_report(input: PathBuf) -> Result<(), String> {
    let _span = info_span!("run_report", input_dir = %input.display()).entered();
    let start = Instant::now();

    let snapshot_path = input.join("config_snapshot.toml");
    let snapshot = fs::read_to_string(&snapshot_path).map_err(|err| {
        format!(
            "failed to read config snapshot {}: {}",
            snapshot_path.display(),
            err
        )
    })?;
    let config: crate::config::Config = toml::from_str(&snapshot)
        .map_err(|err| format!("failed to parse config snapshot: {err}"))?;

    let equity = read_equity_csv(input.join("equity.csv").as_path())?;
    let benchmark = read_equity_csv(input.join("benchmark.csv").as_path())?;

    // Recomputed from the stored curves, so a stale summary.json can never
    // disagree with what gets printed.
    let (report, diagnostics) = analyze(&equity, &benchmark, config.run.periods_per_year)
        .map_err(|err| err.to_string())?;

    metrics::histogram!("wheelhouse.report.generate_ms").record(start.elapsed().as_millis() as f64);
    metrics::gauge!("wheelhouse.report.equity_points").set(equity.len() as f64);

    println!(
        "wheelhouse cli: report (run_id={}, ticker={}, strategy={})",
        config.run.run_id, config.run.ticker, config.strategy.kind
    );
    println!(
        "periods={} start={} end={}",
        equity.len(),
        equity.first().map(|p| p.timestamp).unwrap_or_default(),
        equity.last().map(|p| p.timestamp).unwrap_or_default()
    );
    println!(
        "total_return={:.4} annualized_return={:.4} volatility={:.4} sharpe={:.4}",
        report.total_return, report.annualized_return, report.volatility, report.sharpe_ratio
    );
    println!(
        "benchmark_total_return={:.4} benchmark_annualized_return={:.4} benchmark_volatility={:.4} benchmark_sharpe={:.4}",
        report.benchmark_total_return,
        report.benchmark_annualized_return,
        report.benchmark_volatility,
        report.benchmark_sharpe_ratio
    );
    if !diagnostics.is_empty() {
        println!("alignment diagnostics: {}", diagnostics.len());
    }
    Ok(())
}
