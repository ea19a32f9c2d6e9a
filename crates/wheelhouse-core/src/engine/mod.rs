//! Day-by-day portfolio simulation: one strategy, one series, one
//! deterministic fold.

use crate::data::VolatilitySurface;
use crate::error::{Diagnostic, EngineError, StrategyError};
use crate::strategy::{Strategy, StrategyContext};
use crate::types::{
    EquityPoint, OpenCall, PortfolioState, PriceBar, Signal, TradeEvent, TradeKind,
};

/// Everything a completed run hands back. Diagnostics carry the non-fatal
/// conditions (rejected signals, missing volatility) that degraded single
/// periods to Hold.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    pub equity: Vec<EquityPoint>,
    pub trades: Vec<TradeEvent>,
    pub diagnostics: Vec<Diagnostic>,
}

#[derive(Debug)]
pub struct Simulator<S: Strategy> {
    bars: Vec<PriceBar>,
    strategy: S,
    initial_cash: f64,
    surface: VolatilitySurface,
    portfolio: PortfolioState,
    equity: Vec<EquityPoint>,
    trades: Vec<TradeEvent>,
    diagnostics: Vec<Diagnostic>,
}

impl<S: Strategy> Simulator<S> {
    pub fn new(bars: Vec<PriceBar>, strategy: S, initial_cash: f64) -> Self {
        Self {
            bars,
            strategy,
            initial_cash,
            surface: VolatilitySurface::default(),
            portfolio: PortfolioState::with_cash(initial_cash),
            equity: Vec::new(),
            trades: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Attaches an implied-volatility surface for strategies that price
    /// options. Without one, every lookup resolves to `None`.
    pub fn with_volatility(mut self, surface: VolatilitySurface) -> Self {
        self.surface = surface;
        self
    }

    /// Runs the full simulation. Fails up front on malformed input; once the
    /// period loop starts it always completes, downgrading rejected signals
    /// to Hold.
    pub fn run(mut self) -> Result<RunOutput, EngineError> {
        if !self.initial_cash.is_finite() || self.initial_cash < 0.0 {
            return Err(EngineError::invalid(
                "initial_cash",
                format!("must be finite and >= 0, got {}", self.initial_cash),
            ));
        }
        for pair in self.bars.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(EngineError::invalid(
                    "price_series",
                    format!(
                        "timestamps must be strictly increasing ({} then {})",
                        pair[0].timestamp, pair[1].timestamp
                    ),
                ));
            }
        }

        let bars = std::mem::take(&mut self.bars);
        for (period, bar) in bars.iter().enumerate() {
            let history = &bars[..=period];
            let ctx = StrategyContext {
                period,
                portfolio: &self.portfolio,
                implied_vol: self.surface.nearest(bar.timestamp),
            };

            let signal = match self.strategy.evaluate(history, &ctx) {
                Ok(signal) => signal,
                Err(StrategyError::MissingVolatilityData { timestamp }) => {
                    self.diagnostics
                        .push(Diagnostic::MissingVolatilityData { timestamp });
                    Signal::Hold
                }
            };

            self.apply_signal(bar, signal);
            self.expire_worthless_call(bar);

            self.equity.push(EquityPoint {
                timestamp: bar.timestamp,
                total_value: self.portfolio.total_value(bar.close),
                cash: self.portfolio.cash,
                shares_held: self.portfolio.shares_held,
            });
        }

        Ok(RunOutput {
            equity: self.equity,
            trades: self.trades,
            diagnostics: self.diagnostics,
        })
    }

    fn apply_signal(&mut self, bar: &PriceBar, signal: Signal) {
        match signal {
            Signal::Hold => {}
            Signal::SetPosition { target_shares } => self.apply_set_position(bar, target_shares),
            Signal::SellCoveredCall {
                strike,
                premium,
                expiry,
            } => self.apply_sell_call(bar, strike, premium, expiry),
            Signal::AssignedCall { strike } => self.apply_assignment(bar, strike),
        }
    }

    fn apply_set_position(&mut self, bar: &PriceBar, target_shares: u64) {
        let held = self.portfolio.shares_held;
        if target_shares > held {
            let wanted = target_shares - held;
            let affordable = affordable_shares(self.portfolio.cash, bar.close);
            let quantity = if wanted > affordable {
                self.diagnostics.push(Diagnostic::PositionRejected {
                    timestamp: bar.timestamp,
                    reason: format!(
                        "insufficient cash for {wanted} shares at {}, clamped to {affordable}",
                        bar.close
                    ),
                });
                affordable
            } else {
                wanted
            };
            if quantity == 0 {
                return;
            }
            let cost = quantity as f64 * bar.close;
            self.portfolio.cash -= cost;
            self.portfolio.shares_held += quantity;
            self.trades.push(TradeEvent {
                timestamp: bar.timestamp,
                kind: TradeKind::BuyShares,
                quantity,
                price: bar.close,
                cash_delta: -cost,
            });
        } else if target_shares < held {
            let quantity = held - target_shares;
            let proceeds = quantity as f64 * bar.close;
            self.portfolio.cash += proceeds;
            self.portfolio.shares_held -= quantity;
            self.trades.push(TradeEvent {
                timestamp: bar.timestamp,
                kind: TradeKind::SellShares,
                quantity,
                price: bar.close,
                cash_delta: proceeds,
            });
        }
    }

    fn apply_sell_call(&mut self, bar: &PriceBar, strike: f64, premium: f64, expiry: i64) {
        if self.portfolio.open_call.is_some() {
            self.diagnostics.push(Diagnostic::PositionRejected {
                timestamp: bar.timestamp,
                reason: "covered call rejected: an option is already open".to_string(),
            });
            return;
        }
        let contracts = self.portfolio.shares_held / crate::strategy::CONTRACT_SIZE;
        if contracts == 0 {
            self.diagnostics.push(Diagnostic::PositionRejected {
                timestamp: bar.timestamp,
                reason: format!(
                    "covered call rejected: {} shares cannot cover a contract",
                    self.portfolio.shares_held
                ),
            });
            return;
        }

        self.portfolio.cash += premium;
        self.portfolio.open_call = Some(OpenCall {
            strike,
            expiry,
            contracts,
        });
        self.trades.push(TradeEvent {
            timestamp: bar.timestamp,
            kind: TradeKind::SellCall,
            quantity: contracts,
            price: strike,
            cash_delta: premium,
        });
    }

    fn apply_assignment(&mut self, bar: &PriceBar, strike: f64) {
        let call = match self.portfolio.open_call {
            Some(call) => call,
            None => {
                self.diagnostics.push(Diagnostic::PositionRejected {
                    timestamp: bar.timestamp,
                    reason: "assignment rejected: no open option".to_string(),
                });
                return;
            }
        };
        let covered = call.covered_shares();
        if self.portfolio.shares_held < covered {
            self.diagnostics.push(Diagnostic::PositionRejected {
                timestamp: bar.timestamp,
                reason: format!(
                    "assignment rejected: {} shares held, {covered} covered",
                    self.portfolio.shares_held
                ),
            });
            return;
        }

        let proceeds = strike * covered as f64;
        self.portfolio.cash += proceeds;
        self.portfolio.shares_held -= covered;
        self.portfolio.open_call = None;
        self.trades.push(TradeEvent {
            timestamp: bar.timestamp,
            kind: TradeKind::Assignment,
            quantity: covered,
            price: strike,
            cash_delta: proceeds,
        });
    }

    /// An option past expiry with the close below the strike dies worthless.
    /// The premium was banked when it was written; only the liability goes.
    fn expire_worthless_call(&mut self, bar: &PriceBar) {
        let Some(call) = self.portfolio.open_call else {
            return;
        };
        if bar.timestamp >= call.expiry && bar.close < call.strike {
            self.portfolio.open_call = None;
            self.trades.push(TradeEvent {
                timestamp: bar.timestamp,
                kind: TradeKind::CallExpired,
                quantity: call.contracts,
                price: call.strike,
                cash_delta: 0.0,
            });
        }
    }
}

/// Largest integer share count payable from `cash` at `price`, guarded
/// against the division rounding up past the actual balance.
fn affordable_shares(cash: f64, price: f64) -> u64 {
    if !price.is_finite() || price <= 0.0 || cash <= 0.0 {
        return 0;
    }
    let mut shares = (cash / price).floor() as u64;
    while shares > 0 && shares as f64 * price > cash {
        shares -= 1;
    }
    shares
}
