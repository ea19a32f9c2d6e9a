use crate::error::{EngineError, StrategyError};
use crate::pricing;
use crate::types::{PortfolioState, PriceBar, Signal};

/// Shares covered by one option contract.
pub const CONTRACT_SIZE: u64 = 100;

const SECONDS_PER_DAY: i64 = 86_400;
const DAYS_PER_YEAR: f64 = 365.0;

/// Per-period inputs resolved by the simulator before the strategy runs.
/// `implied_vol` is the nearest usable quote for the current timestamp, or
/// `None` when the surface has nothing for it.
#[derive(Debug, Clone, Copy)]
pub struct StrategyContext<'a> {
    pub period: usize,
    pub portfolio: &'a PortfolioState,
    pub implied_vol: Option<f64>,
}

/// A strategy advises one [`Signal`] per period from the price history up to
/// and including the current bar. It never sees future bars and never mutates
/// portfolio state; `&self` keeps it honest about both.
pub trait Strategy {
    fn name(&self) -> &str;

    fn evaluate(
        &self,
        history: &[PriceBar],
        ctx: &StrategyContext<'_>,
    ) -> Result<Signal, StrategyError>;
}

/// Binary flat/full SMA crossover. Buys `position_size` shares when the fast
/// average crosses above the slow one, exits on the cross back down.
#[derive(Debug, Clone)]
pub struct SmaCrossover {
    fast_window: usize,
    slow_window: usize,
    position_size: u64,
}

impl SmaCrossover {
    pub fn new(
        fast_window: usize,
        slow_window: usize,
        position_size: u64,
    ) -> Result<Self, EngineError> {
        if fast_window == 0 {
            return Err(EngineError::invalid("fast_window", "must be >= 1"));
        }
        if fast_window >= slow_window {
            return Err(EngineError::invalid(
                "slow_window",
                format!("must be > fast_window ({fast_window}), got {slow_window}"),
            ));
        }
        if position_size == 0 {
            return Err(EngineError::invalid("position_size", "must be >= 1"));
        }
        Ok(Self {
            fast_window,
            slow_window,
            position_size,
        })
    }

    fn sma(history: &[PriceBar], window: usize) -> f64 {
        let slice = &history[history.len() - window..];
        slice.iter().map(|bar| bar.close).sum::<f64>() / window as f64
    }
}

impl Strategy for SmaCrossover {
    fn name(&self) -> &str {
        "sma_crossover"
    }

    fn evaluate(
        &self,
        history: &[PriceBar],
        ctx: &StrategyContext<'_>,
    ) -> Result<Signal, StrategyError> {
        if history.len() < self.slow_window {
            return Ok(Signal::Hold);
        }

        let fast = Self::sma(history, self.fast_window);
        let slow = Self::sma(history, self.slow_window);
        let flat = ctx.portfolio.shares_held == 0;

        // Exact tie resolves to Hold: no new action either way.
        if fast > slow && flat {
            return Ok(Signal::SetPosition {
                target_shares: self.position_size,
            });
        }
        if fast < slow && !flat {
            return Ok(Signal::SetPosition { target_shares: 0 });
        }
        Ok(Signal::Hold)
    }
}

/// Covered-call income strategy: hold shares, write an out-of-the-money call
/// against each round lot, collect the premium, let assignment or expiry
/// recycle the position. The state machine is read off the portfolio
/// snapshot, so the strategy itself stays stateless.
#[derive(Debug, Clone)]
pub struct CoveredCall {
    strike_offset_pct: f64,
    contract_period_days: u32,
    risk_free_rate: f64,
    vol_lookback: usize,
    periods_per_year: f64,
}

impl CoveredCall {
    pub fn new(
        strike_offset_pct: f64,
        contract_period_days: u32,
        risk_free_rate: f64,
        vol_lookback: usize,
        periods_per_year: f64,
    ) -> Result<Self, EngineError> {
        if !strike_offset_pct.is_finite() || strike_offset_pct <= -1.0 {
            return Err(EngineError::invalid(
                "strike_offset_pct",
                format!("must be > -1, got {strike_offset_pct}"),
            ));
        }
        if contract_period_days == 0 {
            return Err(EngineError::invalid("contract_period_days", "must be >= 1"));
        }
        if !risk_free_rate.is_finite() {
            return Err(EngineError::invalid("risk_free_rate", "must be finite"));
        }
        if vol_lookback < 2 {
            return Err(EngineError::invalid("vol_lookback", "must be >= 2"));
        }
        if !periods_per_year.is_finite() || periods_per_year <= 0.0 {
            return Err(EngineError::invalid("periods_per_year", "must be > 0"));
        }
        Ok(Self {
            strike_offset_pct,
            contract_period_days,
            risk_free_rate,
            vol_lookback,
            periods_per_year,
        })
    }

    /// Trailing annualized volatility of close-to-close log returns. Needs at
    /// least two returns for a sample stdev; otherwise there is nothing to
    /// price with.
    fn historical_volatility(&self, history: &[PriceBar]) -> Option<f64> {
        if history.len() < 3 {
            return None;
        }
        let start = history.len().saturating_sub(self.vol_lookback + 1);
        let closes: Vec<f64> = history[start..].iter().map(|bar| bar.close).collect();
        let returns: Vec<f64> = closes
            .windows(2)
            .filter(|pair| pair[0] > 0.0 && pair[1] > 0.0)
            .map(|pair| (pair[1] / pair[0]).ln())
            .collect();
        if returns.len() < 2 {
            return None;
        }

        let mean = returns.iter().sum::<f64>() / returns.len() as f64;
        let var = returns
            .iter()
            .map(|ret| {
                let diff = ret - mean;
                diff * diff
            })
            .sum::<f64>()
            / (returns.len() as f64 - 1.0);
        let sigma = var.sqrt() * self.periods_per_year.sqrt();
        if sigma.is_finite() && sigma > 0.0 {
            Some(sigma)
        } else {
            None
        }
    }

    fn resolve_volatility(
        &self,
        history: &[PriceBar],
        ctx: &StrategyContext<'_>,
    ) -> Option<f64> {
        match ctx.implied_vol {
            Some(iv) if iv.is_finite() && iv > 0.0 => Some(iv),
            _ => self.historical_volatility(history),
        }
    }
}

impl Strategy for CoveredCall {
    fn name(&self) -> &str {
        "covered_call"
    }

    fn evaluate(
        &self,
        history: &[PriceBar],
        ctx: &StrategyContext<'_>,
    ) -> Result<Signal, StrategyError> {
        let bar = match history.last() {
            Some(bar) => bar,
            None => return Ok(Signal::Hold),
        };
        let portfolio = ctx.portfolio;

        if let Some(call) = portfolio.open_call {
            // Covered: nothing to do until the contract expires. The
            // simulator clears a worthless expiry itself, so the only signal
            // from here is assignment.
            if bar.timestamp >= call.expiry && bar.close >= call.strike {
                return Ok(Signal::AssignedCall { strike: call.strike });
            }
            return Ok(Signal::Hold);
        }

        if portfolio.shares_held < CONTRACT_SIZE {
            // Uncovered: deploy available cash into shares. Flexible
            // reinvestment, so odd lots accumulate until they cover a
            // contract.
            if bar.close <= 0.0 {
                return Ok(Signal::Hold);
            }
            let affordable = (portfolio.cash / bar.close).floor() as u64;
            if affordable == 0 {
                return Ok(Signal::Hold);
            }
            return Ok(Signal::SetPosition {
                target_shares: portfolio.shares_held + affordable,
            });
        }

        // Holding: write a new call against every round lot.
        let sigma = self
            .resolve_volatility(history, ctx)
            .ok_or(StrategyError::MissingVolatilityData {
                timestamp: bar.timestamp,
            })?;

        let strike = bar.close * (1.0 + self.strike_offset_pct);
        let time_to_expiry = self.contract_period_days as f64 / DAYS_PER_YEAR;
        let contracts = portfolio.shares_held / CONTRACT_SIZE;
        let per_share =
            pricing::call_price(bar.close, strike, time_to_expiry, sigma, self.risk_free_rate)
                .map_err(|_| StrategyError::MissingVolatilityData {
                    timestamp: bar.timestamp,
                })?;

        Ok(Signal::SellCoveredCall {
            strike,
            premium: per_share * (contracts * CONTRACT_SIZE) as f64,
            expiry: bar.timestamp + self.contract_period_days as i64 * SECONDS_PER_DAY,
        })
    }
}

/// Closed set of strategy variants, dispatched exhaustively.
#[derive(Debug, Clone)]
pub enum StrategyKind {
    SmaCrossover(SmaCrossover),
    CoveredCall(CoveredCall),
}

impl Strategy for StrategyKind {
    fn name(&self) -> &str {
        match self {
            StrategyKind::SmaCrossover(strategy) => strategy.name(),
            StrategyKind::CoveredCall(strategy) => strategy.name(),
        }
    }

    fn evaluate(
        &self,
        history: &[PriceBar],
        ctx: &StrategyContext<'_>,
    ) -> Result<Signal, StrategyError> {
        match self {
            StrategyKind::SmaCrossover(strategy) => strategy.evaluate(history, ctx),
            StrategyKind::CoveredCall(strategy) => strategy.evaluate(history, ctx),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CoveredCall, SmaCrossover, Strategy, StrategyContext, CONTRACT_SIZE};
    use crate::error::StrategyError;
    use crate::types::{OpenCall, PortfolioState, PriceBar, Signal};

    fn bar(ts: i64, close: f64) -> PriceBar {
        PriceBar {
            timestamp: ts,
            open: close,
            high: close,
            low: close,
            close,
            volume: 1000.0,
        }
    }

    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        closes
            .iter()
            .enumerate()
            .map(|(idx, close)| bar(idx as i64 * 86_400, *close))
            .collect()
    }

    fn ctx<'a>(portfolio: &'a PortfolioState, implied_vol: Option<f64>) -> StrategyContext<'a> {
        StrategyContext {
            period: 0,
            portfolio,
            implied_vol,
        }
    }

    #[test]
    fn sma_rejects_bad_windows() {
        assert!(SmaCrossover::new(0, 3, 10).is_err());
        assert!(SmaCrossover::new(3, 3, 10).is_err());
        assert!(SmaCrossover::new(5, 3, 10).is_err());
        assert!(SmaCrossover::new(2, 3, 0).is_err());
    }

    #[test]
    fn sma_holds_below_slow_window() {
        let strategy = SmaCrossover::new(2, 3, 10).unwrap();
        let history = bars(&[100.0, 101.0]);
        let portfolio = PortfolioState::with_cash(10_000.0);
        let signal = strategy.evaluate(&history, &ctx(&portfolio, None)).unwrap();
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn sma_five_bar_scenario() {
        // Closes 100,101,99,102,103 with fast=2 slow=3: periods 1-2 lack
        // history, period 3 ties (fast == slow == 100), period 4 has
        // fast < slow while flat, period 5 finally crosses up.
        let strategy = SmaCrossover::new(2, 3, 10).unwrap();
        let series = bars(&[100.0, 101.0, 99.0, 102.0, 103.0]);
        let flat = PortfolioState::with_cash(10_000.0);

        for end in 1..=4 {
            let signal = strategy
                .evaluate(&series[..end], &ctx(&flat, None))
                .unwrap();
            assert_eq!(signal, Signal::Hold, "period {end}");
        }
        let signal = strategy.evaluate(&series, &ctx(&flat, None)).unwrap();
        assert_eq!(signal, Signal::SetPosition { target_shares: 10 });
    }

    #[test]
    fn sma_exits_on_cross_down_only_when_held() {
        let strategy = SmaCrossover::new(2, 3, 10).unwrap();
        let series = bars(&[103.0, 102.0, 99.0]); // fast 100.5 < slow 101.33

        let flat = PortfolioState::with_cash(10_000.0);
        let signal = strategy.evaluate(&series, &ctx(&flat, None)).unwrap();
        assert_eq!(signal, Signal::Hold);

        let mut held = PortfolioState::with_cash(0.0);
        held.shares_held = 10;
        let signal = strategy.evaluate(&series, &ctx(&held, None)).unwrap();
        assert_eq!(signal, Signal::SetPosition { target_shares: 0 });
    }

    #[test]
    fn sma_does_not_rebuy_while_full() {
        let strategy = SmaCrossover::new(2, 3, 10).unwrap();
        let series = bars(&[100.0, 102.0, 104.0, 106.0]);
        let mut held = PortfolioState::with_cash(0.0);
        held.shares_held = 10;
        let signal = strategy.evaluate(&series, &ctx(&held, None)).unwrap();
        assert_eq!(signal, Signal::Hold);
    }

    #[test]
    fn covered_call_buys_when_uncovered() {
        let strategy = CoveredCall::new(0.05, 7, 0.02, 20, 52.0).unwrap();
        let history = bars(&[100.0]);
        let portfolio = PortfolioState::with_cash(10_050.0);
        let signal = strategy.evaluate(&history, &ctx(&portfolio, None)).unwrap();
        assert_eq!(signal, Signal::SetPosition { target_shares: 100 });
    }

    #[test]
    fn covered_call_sells_call_with_implied_vol() {
        let strategy = CoveredCall::new(0.05, 7, 0.02, 20, 52.0).unwrap();
        let history = bars(&[100.0, 101.0]);
        let mut portfolio = PortfolioState::with_cash(50.0);
        portfolio.shares_held = CONTRACT_SIZE;

        let signal = strategy
            .evaluate(&history, &ctx(&portfolio, Some(0.25)))
            .unwrap();
        match signal {
            Signal::SellCoveredCall { strike, premium, expiry } => {
                assert!((strike - 101.0 * 1.05).abs() < 1e-9);
                assert!(premium > 0.0);
                assert_eq!(expiry, history[1].timestamp + 7 * 86_400);
            }
            other => panic!("expected SellCoveredCall, got {other:?}"),
        }
    }

    #[test]
    fn covered_call_requires_volatility_at_first_sale() {
        let strategy = CoveredCall::new(0.05, 7, 0.02, 20, 52.0).unwrap();
        let history = bars(&[100.0]);
        let mut portfolio = PortfolioState::with_cash(0.0);
        portfolio.shares_held = CONTRACT_SIZE;

        let err = strategy
            .evaluate(&history, &ctx(&portfolio, None))
            .unwrap_err();
        assert!(matches!(err, StrategyError::MissingVolatilityData { .. }));
    }

    #[test]
    fn covered_call_falls_back_to_historical_vol() {
        let strategy = CoveredCall::new(0.05, 7, 0.02, 20, 52.0).unwrap();
        let history = bars(&[100.0, 102.0, 99.0, 101.0]);
        let mut portfolio = PortfolioState::with_cash(0.0);
        portfolio.shares_held = CONTRACT_SIZE;

        let signal = strategy.evaluate(&history, &ctx(&portfolio, None)).unwrap();
        assert!(matches!(signal, Signal::SellCoveredCall { .. }));
    }

    #[test]
    fn covered_call_assignment_at_expiry() {
        let strategy = CoveredCall::new(0.05, 7, 0.02, 20, 52.0).unwrap();
        let expiry = 7 * 86_400;
        let mut portfolio = PortfolioState::with_cash(0.0);
        portfolio.shares_held = CONTRACT_SIZE;
        portfolio.open_call = Some(OpenCall {
            strike: 105.0,
            expiry,
            contracts: 1,
        });

        // Above strike at expiry: assigned.
        let history = vec![bar(0, 100.0), bar(expiry, 106.0)];
        let signal = strategy.evaluate(&history, &ctx(&portfolio, None)).unwrap();
        assert_eq!(signal, Signal::AssignedCall { strike: 105.0 });

        // Below strike at expiry: hold, simulator clears the contract.
        let history = vec![bar(0, 100.0), bar(expiry, 104.0)];
        let signal = strategy.evaluate(&history, &ctx(&portfolio, None)).unwrap();
        assert_eq!(signal, Signal::Hold);

        // Before expiry: hold regardless of price.
        let history = vec![bar(0, 100.0), bar(expiry - 86_400, 120.0)];
        let signal = strategy.evaluate(&history, &ctx(&portfolio, None)).unwrap();
        assert_eq!(signal, Signal::Hold);
    }
}
