use serde::Serialize;
use thiserror::Error;

/// Fatal errors. Any of these abort a run before it produces output; the
/// recoverable conditions live in [`Diagnostic`] instead.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("invalid input for {parameter}: {reason}")]
    InvalidInput {
        parameter: &'static str,
        reason: String,
    },
}

impl EngineError {
    pub fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidInput {
            parameter,
            reason: reason.into(),
        }
    }
}

/// Recoverable strategy failures. The simulator degrades the period to Hold
/// and records a diagnostic; the run continues.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StrategyError {
    #[error("no volatility data available at {timestamp}")]
    MissingVolatilityData { timestamp: i64 },
}

/// Non-fatal conditions accumulated during a run and returned alongside the
/// results. Never dropped silently.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    PositionRejected {
        timestamp: i64,
        reason: String,
    },
    MissingVolatilityData {
        timestamp: i64,
    },
    DataAlignmentWarning {
        timestamp: i64,
        filled_periods: usize,
    },
}

impl Diagnostic {
    pub fn timestamp(&self) -> i64 {
        match self {
            Diagnostic::PositionRejected { timestamp, .. } => *timestamp,
            Diagnostic::MissingVolatilityData { timestamp } => *timestamp,
            Diagnostic::DataAlignmentWarning { timestamp, .. } => *timestamp,
        }
    }
}
