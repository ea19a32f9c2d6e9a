//! Wheelhouse engine: strategy abstraction, portfolio simulator, option
//! pricing and performance analytics for single-asset backtests.

pub mod analytics;
pub mod data;
pub mod engine;
pub mod error;
pub mod pricing;
pub mod report;
pub mod strategy;
pub mod types;

pub use analytics::{analyze, benchmark_curve, PerformanceReport};
pub use engine::{RunOutput, Simulator};
pub use error::{Diagnostic, EngineError, StrategyError};
pub use strategy::{CoveredCall, SmaCrossover, Strategy, StrategyContext, StrategyKind};
