//! Return/risk statistics over completed equity curves.

use crate::error::{Diagnostic, EngineError};
use crate::types::{EquityPoint, PriceBar};
use serde::Serialize;

/// Derived, read-only summary of one run against its benchmark. Always
/// recomputed from full curves, never updated incrementally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    pub total_return: f64,
    pub annualized_return: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub benchmark_total_return: f64,
    pub benchmark_annualized_return: f64,
    pub benchmark_volatility: f64,
    pub benchmark_sharpe_ratio: f64,
}

#[derive(Debug, Clone, Copy)]
struct CurveStats {
    total_return: f64,
    annualized_return: f64,
    volatility: f64,
    sharpe_ratio: f64,
}

fn curve_stats(values: &[f64], periods_per_year: f64) -> Result<CurveStats, EngineError> {
    let first = *values
        .first()
        .ok_or_else(|| EngineError::invalid("equity_history", "must not be empty"))?;
    if !first.is_finite() || first <= 0.0 {
        return Err(EngineError::invalid(
            "equity_history",
            format!("initial equity must be > 0, got {first}"),
        ));
    }
    let last = *values.last().unwrap_or(&first);

    let total_return = last / first - 1.0;
    let annualized_return =
        (1.0 + total_return).powf(periods_per_year / values.len() as f64) - 1.0;

    let returns: Vec<f64> = values
        .windows(2)
        .filter(|pair| pair[0] > 0.0)
        .map(|pair| pair[1] / pair[0] - 1.0)
        .collect();

    // Under two periods there is no return series to measure; volatility is 0
    // and the Sharpe ratio is 0 by convention (never a division error).
    let volatility = if returns.len() < 2 {
        0.0
    } else {
        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let var = returns
            .iter()
            .map(|ret| {
                let diff = ret - mean;
                diff * diff
            })
            .sum::<f64>()
            / (returns.len() as f64 - 1.0);
        var.sqrt() * periods_per_year.sqrt()
    };

    let sharpe_ratio = if volatility > 0.0 {
        annualized_return / volatility
    } else {
        0.0
    };

    Ok(CurveStats {
        total_return,
        annualized_return,
        volatility,
        sharpe_ratio,
    })
}

/// Forward-fills benchmark values onto the equity timestamps. A fill that
/// spans more than one consecutive equity period raises a
/// `DataAlignmentWarning`; nothing is interpolated.
fn align_benchmark(
    equity: &[EquityPoint],
    benchmark: &[EquityPoint],
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<f64> {
    let mut aligned = Vec::with_capacity(equity.len());
    let mut idx = 0usize;
    let mut filled_streak = 0usize;

    for point in equity {
        while idx + 1 < benchmark.len() && benchmark[idx + 1].timestamp <= point.timestamp {
            idx += 1;
        }
        let bench = &benchmark[idx];
        if bench.timestamp == point.timestamp {
            filled_streak = 0;
        } else {
            filled_streak += 1;
            if filled_streak == 2 {
                diagnostics.push(Diagnostic::DataAlignmentWarning {
                    timestamp: point.timestamp,
                    filled_periods: filled_streak,
                });
            }
        }
        aligned.push(bench.total_value);
    }
    aligned
}

/// Computes the [`PerformanceReport`] for a strategy curve against its
/// benchmark. Both curves must be non-empty with positive starting values;
/// alignment gaps come back as diagnostics, not failures.
pub fn analyze(
    equity: &[EquityPoint],
    benchmark: &[EquityPoint],
    periods_per_year: f64,
) -> Result<(PerformanceReport, Vec<Diagnostic>), EngineError> {
    if !periods_per_year.is_finite() || periods_per_year <= 0.0 {
        return Err(EngineError::invalid("periods_per_year", "must be > 0"));
    }
    if benchmark.is_empty() {
        return Err(EngineError::invalid("benchmark_history", "must not be empty"));
    }

    let mut diagnostics = Vec::new();
    let values: Vec<f64> = equity.iter().map(|point| point.total_value).collect();
    let strategy = curve_stats(&values, periods_per_year)?;

    let aligned = align_benchmark(equity, benchmark, &mut diagnostics);
    let bench = curve_stats(&aligned, periods_per_year)?;

    Ok((
        PerformanceReport {
            total_return: strategy.total_return,
            annualized_return: strategy.annualized_return,
            volatility: strategy.volatility,
            sharpe_ratio: strategy.sharpe_ratio,
            benchmark_total_return: bench.total_return,
            benchmark_annualized_return: bench.annualized_return,
            benchmark_volatility: bench.volatility,
            benchmark_sharpe_ratio: bench.sharpe_ratio,
        },
        diagnostics,
    ))
}

/// Rescales benchmark closes to the strategy's starting capital so both
/// curves share a unit.
pub fn benchmark_curve(
    bars: &[PriceBar],
    initial_value: f64,
) -> Result<Vec<EquityPoint>, EngineError> {
    let first = bars
        .first()
        .ok_or_else(|| EngineError::invalid("benchmark_series", "must not be empty"))?;
    if !first.close.is_finite() || first.close <= 0.0 {
        return Err(EngineError::invalid(
            "benchmark_series",
            format!("first close must be > 0, got {}", first.close),
        ));
    }

    Ok(bars
        .iter()
        .map(|bar| EquityPoint {
            timestamp: bar.timestamp,
            total_value: initial_value * bar.close / first.close,
            cash: 0.0,
            shares_held: 0,
        })
        .collect())
}
