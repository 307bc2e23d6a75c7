//! # Options Pricing & Greeks
//!
//! Black-Scholes valuation primitives consumed by the gamma and delta-hedging
//! agents and by downstream risk checks.
//!
//! ## Description
//! Analytical European option pricing, a Newton-Raphson implied-volatility
//! solver, and first-order sensitivities (plus gamma). Everything is a pure
//! function of its inputs; no market-data access and no state.
//!
//! ## References
//! - Black, F., & Scholes, M. (1973). The Pricing of Options and Corporate
//!   Liabilities. Journal of Political Economy, 81(3), 637-654.
//! - Hull, J. C. (2018). Options, Futures, and Other Derivatives, 10th ed.

pub mod greeks;
pub mod pricing;

pub use greeks::{OptionGreeks, OptionType};
pub use pricing::{black_scholes_call, black_scholes_put, implied_volatility};

pub(crate) mod math {
    use std::f64::consts::PI;

    /// Standard normal CDF via the error function.
    pub fn norm_cdf(x: f64) -> f64 {
        0.5 * (1.0 + erf(x / (2.0_f64).sqrt()))
    }

    /// Standard normal PDF.
    pub fn norm_pdf(x: f64) -> f64 {
        (-(x * x) / 2.0).exp() / (2.0 * PI).sqrt()
    }

    /// Abramowitz & Stegun 7.1.26 rational approximation, max error < 1.5e-7.
    pub fn erf(x: f64) -> f64 {
        let a1 = 0.254829592;
        let a2 = -0.284496736;
        let a3 = 1.421413741;
        let a4 = -1.453152027;
        let a5 = 1.061405429;
        let p = 0.3275911;

        let sign = if x < 0.0 { -1.0 } else { 1.0 };
        let x = x.abs();

        let t = 1.0 / (1.0 + p * x);
        let y = 1.0 - (((((a5 * t + a4) * t) + a3) * t + a2) * t + a1) * t * (-x * x).exp();

        sign * y
    }

    /// Black-Scholes d1/d2 terms.
    pub fn d1_d2(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> (f64, f64) {
        let sqrt_t = time.sqrt();
        let d1 = ((spot / strike).ln() + (rate + vol * vol / 2.0) * time) / (vol * sqrt_t);
        (d1, d1 - vol * sqrt_t)
    }
}
