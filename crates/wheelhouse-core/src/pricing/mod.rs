//! Closed-form European call valuation used by the covered-call strategy.

use crate::error::EngineError;

/// Standard normal CDF via the Abramowitz-Stegun erf approximation
/// (max error ~1.5e-7).
pub fn norm_cdf(x: f64) -> f64 {
    0.5 * (1.0 + erf(x / std::f64::consts::SQRT_2))
}

fn erf(x: f64) -> f64 {
    const A1: f64 = 0.254829592;
    const A2: f64 = -0.284496736;
    const A3: f64 = 1.421413741;
    const A4: f64 = -1.453152027;
    const A5: f64 = 1.061405429;
    const P: f64 = 0.3275911;

    let sign = if x < 0.0 { -1.0 } else { 1.0 };
    let x = x.abs();

    let t = 1.0 / (1.0 + P * x);
    let poly = ((((A5 * t + A4) * t + A3) * t + A2) * t + A1) * t;
    sign * (1.0 - poly * (-x * x).exp())
}

/// Black-Scholes price of a European call.
///
/// `time_to_expiry_years == 0` or `volatility == 0` collapse to intrinsic
/// value, which keeps d1/d2 away from a zero denominator. Pure and
/// deterministic; safe to call from parallel runs.
pub fn call_price(
    spot: f64,
    strike: f64,
    time_to_expiry_years: f64,
    volatility: f64,
    risk_free_rate: f64,
) -> Result<f64, EngineError> {
    if !spot.is_finite() || spot <= 0.0 {
        return Err(EngineError::invalid("spot", format!("must be > 0, got {spot}")));
    }
    if !strike.is_finite() || strike <= 0.0 {
        return Err(EngineError::invalid(
            "strike",
            format!("must be > 0, got {strike}"),
        ));
    }
    if !time_to_expiry_years.is_finite() || time_to_expiry_years < 0.0 {
        return Err(EngineError::invalid(
            "time_to_expiry_years",
            format!("must be >= 0, got {time_to_expiry_years}"),
        ));
    }
    if !volatility.is_finite() || volatility < 0.0 {
        return Err(EngineError::invalid(
            "volatility",
            format!("must be >= 0, got {volatility}"),
        ));
    }
    if !risk_free_rate.is_finite() {
        return Err(EngineError::invalid("risk_free_rate", "must be finite"));
    }

    if time_to_expiry_years == 0.0 || volatility == 0.0 {
        return Ok((spot - strike).max(0.0));
    }

    let sqrt_t = time_to_expiry_years.sqrt();
    let d1 = ((spot / strike).ln()
        + (risk_free_rate + 0.5 * volatility * volatility) * time_to_expiry_years)
        / (volatility * sqrt_t);
    let d2 = d1 - volatility * sqrt_t;

    let premium = spot * norm_cdf(d1)
        - strike * (-risk_free_rate * time_to_expiry_years).exp() * norm_cdf(d2);
    Ok(premium.max(0.0))
}
