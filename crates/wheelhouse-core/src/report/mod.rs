//! Run artifacts: plain-data files a front end can render without touching
//! the engine.

use crate::analytics::PerformanceReport;
use crate::error::Diagnostic;
use crate::types::{EquityPoint, TradeEvent, TradeKind};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;

#[derive(Debug, Clone, Serialize)]
pub struct SummaryMeta {
    pub run_id: String,
    pub ticker: String,
    pub strategy: String,
    pub start: i64,
    pub end: i64,
}

pub fn write_equity_csv(path: &Path, points: &[EquityPoint]) -> Result<(), String> {
    let mut output = String::from("timestamp,total_value,cash,shares_held\n");
    for point in points {
        output.push_str(&format!(
            "{},{},{},{}\n",
            point.timestamp, point.total_value, point.cash, point.shares_held
        ));
    }
    fs::write(path, output).map_err(|err| format!("failed to write equity: {err}"))
}

pub fn write_trades_csv(path: &Path, trades: &[TradeEvent]) -> Result<(), String> {
    let mut output = String::from("timestamp,kind,quantity,price,cash_delta\n");
    for trade in trades {
        output.push_str(&format!(
            "{},{},{},{},{}\n",
            trade.timestamp,
            trade_kind_label(trade.kind),
            trade.quantity,
            trade.price,
            trade.cash_delta
        ));
    }
    fs::write(path, output).map_err(|err| format!("failed to write trades: {err}"))
}

fn trade_kind_label(kind: TradeKind) -> &'static str {
    match kind {
        TradeKind::BuyShares => "buy_shares",
        TradeKind::SellShares => "sell_shares",
        TradeKind::SellCall => "sell_call",
        TradeKind::Assignment => "assignment",
        TradeKind::CallExpired => "call_expired",
    }
}

pub fn write_summary_json(
    path: &Path,
    report: &PerformanceReport,
    meta: Option<&SummaryMeta>,
    diagnostics: &[Diagnostic],
) -> Result<(), String> {
    let json = serde_json::json!({
        "meta": meta,
        "report": report,
        "diagnostics_count": diagnostics.len(),
    });
    let json = serde_json::to_string_pretty(&json)
        .map_err(|err| format!("failed to serialize summary: {err}"))?;
    fs::write(path, json).map_err(|err| format!("failed to write summary: {err}"))
}

pub fn write_diagnostics_jsonl(path: &Path, diagnostics: &[Diagnostic]) -> Result<(), String> {
    let mut file =
        fs::File::create(path).map_err(|err| format!("failed to create diagnostics: {err}"))?;
    for diagnostic in diagnostics {
        let line = serde_json::to_string(diagnostic)
            .map_err(|err| format!("failed to serialize diagnostic: {err}"))?;
        file.write_all(line.as_bytes())
            .and_then(|_| file.write_all(b"\n"))
            .map_err(|err| format!("failed to write diagnostic: {err}"))?;
    }
    Ok(())
}

#[derive(Debug, serde::Deserialize)]
struct EquityRecord {
    timestamp: i64,
    total_value: f64,
    cash: f64,
    shares_held: u64,
}

pub fn read_equity_csv(path: &Path) -> Result<Vec<EquityPoint>, String> {
    let file = fs::File::open(path)
        .map_err(|err| format!("failed to open equity csv {}: {}", path.display(), err))?;
    let mut reader = csv::Reader::from_reader(file);
    let mut points = Vec::new();
    for result in reader.deserialize::<EquityRecord>() {
        let record = result.map_err(|err| format!("failed to parse equity row: {err}"))?;
        points.push(EquityPoint {
            timestamp: record.timestamp,
            total_value: record.total_value,
            cash: record.cash,
            shares_held: record.shares_held,
        });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::{
        read_equity_csv, write_diagnostics_jsonl, write_equity_csv, write_summary_json,
        write_trades_csv, SummaryMeta,
    };
    use crate::analytics::PerformanceReport;
    use crate::error::Diagnostic;
    use crate::types::{EquityPoint, TradeEvent, TradeKind};
    use std::fs;
    use std::path::Path;

    #[test]
    fn writes_and_reads_run_artifacts() {
        let dir = Path::new("/tmp/wheelhouse_report_test");
        let _ = fs::create_dir_all(dir);

        let equity = vec![
            EquityPoint {
                timestamp: 1,
                total_value: 10_000.0,
                cash: 10_000.0,
                shares_held: 0,
            },
            EquityPoint {
                timestamp: 2,
                total_value: 10_050.0,
                cash: 50.0,
                shares_held: 100,
            },
        ];
        let trades = vec![TradeEvent {
            timestamp: 2,
            kind: TradeKind::BuyShares,
            quantity: 100,
            price: 100.0,
            cash_delta: -10_000.0,
        }];
        let report = PerformanceReport {
            total_return: 0.005,
            annualized_return: 0.01,
            volatility: 0.0,
            sharpe_ratio: 0.0,
            benchmark_total_return: 0.0,
            benchmark_annualized_return: 0.0,
            benchmark_volatility: 0.0,
            benchmark_sharpe_ratio: 0.0,
        };
        let diagnostics = vec![Diagnostic::PositionRejected {
            timestamp: 2,
            reason: "unit".to_string(),
        }];
        let meta = SummaryMeta {
            run_id: "run1".to_string(),
            ticker: "AAPL".to_string(),
            strategy: "covered_call".to_string(),
            start: 1,
            end: 2,
        };

        write_equity_csv(dir.join("equity.csv").as_path(), &equity).expect("equity");
        write_trades_csv(dir.join("trades.csv").as_path(), &trades).expect("trades");
        write_summary_json(
            dir.join("summary.json").as_path(),
            &report,
            Some(&meta),
            &diagnostics,
        )
        .expect("summary");
        write_diagnostics_jsonl(dir.join("diagnostics.jsonl").as_path(), &diagnostics)
            .expect("diagnostics");

        let restored = read_equity_csv(dir.join("equity.csv").as_path()).expect("read equity");
        assert_eq!(restored, equity);

        let summary = fs::read_to_string(dir.join("summary.json")).expect("summary contents");
        assert!(summary.contains("\"total_return\""));
        assert!(summary.contains("\"run_id\""));
    }
}
