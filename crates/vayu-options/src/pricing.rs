//! # Black-Scholes Pricing
//!
//! European option prices and a Newton-Raphson implied-volatility solver.

use crate::math::{d1_d2, norm_cdf, norm_pdf};

/// European call price.
///
/// # Parameters
/// * `spot` - current underlying price
/// * `strike` - strike price
/// * `time` - time to expiry in years
/// * `rate` - risk-free rate
/// * `vol` - annualized volatility
pub fn black_scholes_call(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> f64 {
    if time <= 0.0 {
        return (spot - strike).max(0.0);
    }
    let (d1, d2) = d1_d2(spot, strike, time, rate, vol);
    spot * norm_cdf(d1) - strike * (-rate * time).exp() * norm_cdf(d2)
}

/// European put price.
pub fn black_scholes_put(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> f64 {
    if time <= 0.0 {
        return (strike - spot).max(0.0);
    }
    let (d1, d2) = d1_d2(spot, strike, time, rate, vol);
    strike * (-rate * time).exp() * norm_cdf(-d2) - spot * norm_cdf(-d1)
}

/// Solves for the volatility that reproduces `market_price`.
///
/// Newton-Raphson on vega, seeded at 20% vol. Returns `None` when the price
/// is outside no-arbitrage bounds or the iteration fails to converge
/// (deep ITM/OTM quotes with negligible vega).
pub fn implied_volatility(
    market_price: f64,
    spot: f64,
    strike: f64,
    time: f64,
    rate: f64,
    is_call: bool,
) -> Option<f64> {
    if market_price <= 0.0 || time <= 0.0 {
        return None;
    }

    const MAX_ITERS: usize = 100;
    const TOLERANCE: f64 = 1e-6;

    let mut vol = 0.20;
    for _ in 0..MAX_ITERS {
        let price = if is_call {
            black_scholes_call(spot, strike, time, rate, vol)
        } else {
            black_scholes_put(spot, strike, time, rate, vol)
        };
        let diff = price - market_price;
        if diff.abs() < TOLERANCE {
            return Some(vol);
        }

        // Vega in absolute terms (not per-1%) for the Newton step.
        let (d1, _) = d1_d2(spot, strike, time, rate, vol);
        let vega = spot * time.sqrt() * norm_pdf(d1);
        if vega < 1e-10 {
            return None;
        }

        vol -= diff / vega;
        if vol <= 0.001 || vol > 5.0 {
            return None;
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_call_parity_holds() {
        let (s, k, t, r, v) = (500.0, 495.0, 30.0 / 365.0, 0.04, 0.22);
        let call = black_scholes_call(s, k, t, r, v);
        let put = black_scholes_put(s, k, t, r, v);
        // C - P = S - K e^{-rT}
        let parity = s - k * (-r * t).exp();
        assert!((call - put - parity).abs() < 1e-9, "parity violated: {}", call - put - parity);
    }

    #[test]
    fn intrinsic_value_at_expiry() {
        assert_eq!(black_scholes_call(510.0, 500.0, 0.0, 0.04, 0.2), 10.0);
        assert_eq!(black_scholes_put(510.0, 500.0, 0.0, 0.04, 0.2), 0.0);
    }

    #[test]
    fn implied_vol_round_trip() {
        let (s, k, t, r) = (500.0, 505.0, 14.0 / 365.0, 0.04);
        let price = black_scholes_call(s, k, t, r, 0.31);
        let iv = implied_volatility(price, s, k, t, r, true).expect("solver should converge");
        assert!((iv - 0.31).abs() < 1e-4, "recovered {} expected 0.31", iv);
    }

    #[test]
    fn implied_vol_rejects_unpriceable_quotes() {
        assert!(implied_volatility(0.0, 500.0, 500.0, 0.1, 0.04, true).is_none());
        assert!(implied_volatility(1.0, 500.0, 500.0, 0.0, 0.04, true).is_none());
    }
}
