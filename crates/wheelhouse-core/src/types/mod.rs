use serde::{Deserialize, Serialize};

/// One period of market data. Timestamps are unix seconds, UTC.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Implied-volatility observation. `implied` is `None` when the supplier had
/// no usable quote for that timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct VolatilityQuote {
    pub timestamp: i64,
    pub implied: Option<f64>,
}

/// An open short call written against held shares. One contract covers 100
/// shares.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenCall {
    pub strike: f64,
    pub expiry: i64,
    pub contracts: u64,
}

impl OpenCall {
    pub fn covered_shares(&self) -> u64 {
        self.contracts * crate::strategy::CONTRACT_SIZE
    }
}

/// Portfolio snapshot owned by the simulator. Strategies only ever see a
/// shared reference; all mutation happens in the period loop.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioState {
    pub cash: f64,
    pub shares_held: u64,
    pub open_call: Option<OpenCall>,
}

impl PortfolioState {
    pub fn with_cash(initial_cash: f64) -> Self {
        Self {
            cash: initial_cash,
            shares_held: 0,
            open_call: None,
        }
    }

    /// Mark-to-market value at `close`: short calls are carried at intrinsic
    /// value so the curve stays deterministic without a per-period vol quote.
    pub fn total_value(&self, close: f64) -> f64 {
        let liability = self
            .open_call
            .map(|call| (close - call.strike).max(0.0) * call.covered_shares() as f64)
            .unwrap_or(0.0);
        self.cash + self.shares_held as f64 * close - liability
    }
}

/// What a strategy asks the simulator to do for one period.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Signal {
    Hold,
    SetPosition { target_shares: u64 },
    SellCoveredCall { strike: f64, premium: f64, expiry: i64 },
    AssignedCall { strike: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub total_value: f64,
    pub cash: f64,
    pub shares_held: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    BuyShares,
    SellShares,
    SellCall,
    Assignment,
    CallExpired,
}

/// Applied portfolio action, recorded for the trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    pub timestamp: i64,
    pub kind: TradeKind,
    pub quantity: u64,
    pub price: f64,
    pub cash_delta: f64,
}
