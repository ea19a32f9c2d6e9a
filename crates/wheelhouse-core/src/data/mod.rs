//! Boundary with the market-data supplier: CSV series in, ordered bars out.

use crate::types::{PriceBar, VolatilityQuote};
use chrono::NaiveDate;
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Counters over an incoming series. The loader reports, the caller decides
/// how much mess it tolerates.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DataQualityReport {
    pub rows: usize,
    pub duplicates: usize,
    pub out_of_order: usize,
    pub invalid_close: usize,
    pub first_timestamp: Option<i64>,
    pub last_timestamp: Option<i64>,
}

pub fn data_quality_from_bars(bars: &[PriceBar]) -> DataQualityReport {
    let mut report = DataQualityReport {
        rows: bars.len(),
        ..DataQualityReport::default()
    };
    if bars.is_empty() {
        return report;
    }

    report.first_timestamp = Some(bars[0].timestamp);
    report.last_timestamp = Some(bars[bars.len() - 1].timestamp);

    let mut last_ts: Option<i64> = None;
    for bar in bars {
        if let Some(prev) = last_ts {
            if bar.timestamp == prev {
                report.duplicates += 1;
            } else if bar.timestamp < prev {
                report.out_of_order += 1;
            }
        }
        if !bar.close.is_finite() || bar.close <= 0.0 {
            report.invalid_close += 1;
        }
        last_ts = Some(bar.timestamp);
    }
    report
}

#[derive(Debug, Deserialize)]
struct BarRecord {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

#[derive(Debug, Deserialize)]
struct VolatilityRecord {
    timestamp: String,
    implied_volatility: Option<f64>,
}

/// Accepts unix seconds or a `YYYY-MM-DD` date (taken as midnight UTC).
fn parse_timestamp(raw: &str) -> Result<i64, String> {
    let raw = raw.trim();
    if let Ok(ts) = raw.parse::<i64>() {
        return Ok(ts);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|err| format!("invalid timestamp {raw:?}: {err}"))?;
    let midnight = date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| format!("invalid timestamp {raw:?}"))?;
    Ok(midnight.and_utc().timestamp())
}

/// Loads an OHLCV series with columns
/// `timestamp,open,high,low,close,volume`.
pub fn load_bars_csv(path: &Path) -> Result<(Vec<PriceBar>, DataQualityReport), String> {
    let file = fs::File::open(path)
        .map_err(|err| format!("failed to open bars csv {}: {}", path.display(), err))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut bars = Vec::new();
    for result in reader.deserialize::<BarRecord>() {
        let record = result.map_err(|err| format!("failed to parse bars row: {err}"))?;
        bars.push(PriceBar {
            timestamp: parse_timestamp(&record.timestamp)?,
            open: record.open,
            high: record.high,
            low: record.low,
            close: record.close,
            volume: record.volume,
        });
    }
    let report = data_quality_from_bars(&bars);
    Ok((bars, report))
}

/// Loads implied-volatility quotes with columns
/// `timestamp,implied_volatility` (the second may be empty).
pub fn load_volatility_csv(path: &Path) -> Result<Vec<VolatilityQuote>, String> {
    let file = fs::File::open(path)
        .map_err(|err| format!("failed to open volatility csv {}: {}", path.display(), err))?;
    let mut reader = csv::Reader::from_reader(file);

    let mut quotes = Vec::new();
    for result in reader.deserialize::<VolatilityRecord>() {
        let record = result.map_err(|err| format!("failed to parse volatility row: {err}"))?;
        quotes.push(VolatilityQuote {
            timestamp: parse_timestamp(&record.timestamp)?,
            implied: record.implied_volatility,
        });
    }
    quotes.sort_by_key(|quote| quote.timestamp);
    Ok(quotes)
}

/// Nearest-timestamp lookup over implied-volatility quotes. Absent, NaN or
/// non-positive quotes resolve to `None` rather than an error; the strategy
/// decides whether a fallback applies.
#[derive(Debug, Default, Clone)]
pub struct VolatilitySurface {
    quotes: Vec<VolatilityQuote>,
}

impl VolatilitySurface {
    pub fn new(mut quotes: Vec<VolatilityQuote>) -> Self {
        quotes.sort_by_key(|quote| quote.timestamp);
        Self { quotes }
    }

    pub fn is_empty(&self) -> bool {
        self.quotes.is_empty()
    }

    pub fn nearest(&self, timestamp: i64) -> Option<f64> {
        let quote = self
            .quotes
            .iter()
            .min_by_key(|quote| (quote.timestamp - timestamp).abs())?;
        match quote.implied {
            Some(iv) if iv.is_finite() && iv > 0.0 => Some(iv),
            _ => None,
        }
    }
}
