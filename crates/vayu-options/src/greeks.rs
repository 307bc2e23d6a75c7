//! # Option Greeks
//!
//! First and second-order sensitivities for European options.
//!
//! Theta is reported per calendar day, vega and rho per 1% move in their
//! respective inputs, matching how the rest of the system consumes them.

use crate::math::{d1_d2, norm_cdf, norm_pdf};
use serde::{Deserialize, Serialize};

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionType {
    Call,
    Put,
}

/// The five primary Greeks of a single option position.
///
/// # Fields
/// * `delta` - price sensitivity to the underlying; call ∈ [0,1], put ∈ [-1,0]
/// * `gamma` - delta sensitivity to the underlying; non-negative for longs
/// * `theta` - time decay per calendar day, typically negative for longs
/// * `vega`  - sensitivity per 1% implied-volatility change
/// * `rho`   - sensitivity per 1% interest-rate change
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OptionGreeks {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
}

impl OptionGreeks {
    /// Computes all Greeks for one European option.
    ///
    /// # Parameters
    /// * `spot` - current underlying price, must be positive
    /// * `strike` - strike price, must be positive
    /// * `time` - time to expiry in years (one trading hour ≈ 1/(252*6.5))
    /// * `rate` - risk-free rate (0.04 = 4%)
    /// * `vol` - annualized implied volatility (0.20 = 20%)
    pub fn compute(
        spot: f64,
        strike: f64,
        time: f64,
        rate: f64,
        vol: f64,
        option_type: OptionType,
    ) -> Self {
        if time <= 0.0 {
            return Self::at_expiry(spot, strike, option_type);
        }

        let (d1, d2) = d1_d2(spot, strike, time, rate, vol);
        let sqrt_t = time.sqrt();
        let npd1 = norm_pdf(d1);
        let discount = (-rate * time).exp();
        let gamma = npd1 / (spot * vol * sqrt_t);
        let vega = spot * sqrt_t * npd1 / 100.0;

        match option_type {
            OptionType::Call => Self {
                delta: norm_cdf(d1),
                gamma,
                theta: (-(spot * npd1 * vol) / (2.0 * sqrt_t)
                    - rate * strike * discount * norm_cdf(d2))
                    / 365.0,
                vega,
                rho: strike * time * discount * norm_cdf(d2) / 100.0,
            },
            OptionType::Put => Self {
                delta: norm_cdf(d1) - 1.0,
                gamma,
                theta: (-(spot * npd1 * vol) / (2.0 * sqrt_t)
                    + rate * strike * discount * norm_cdf(-d2))
                    / 365.0,
                vega,
                rho: -strike * time * discount * norm_cdf(-d2) / 100.0,
            },
        }
    }

    /// Shorthand for [`Self::compute`] with [`OptionType::Call`].
    pub fn for_call(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> Self {
        Self::compute(spot, strike, time, rate, vol, OptionType::Call)
    }

    /// Shorthand for [`Self::compute`] with [`OptionType::Put`].
    pub fn for_put(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> Self {
        Self::compute(spot, strike, time, rate, vol, OptionType::Put)
    }

    /// Intrinsic-only Greeks at or past expiry.
    fn at_expiry(spot: f64, strike: f64, option_type: OptionType) -> Self {
        let delta = match option_type {
            OptionType::Call => {
                if spot > strike {
                    1.0
                } else {
                    0.0
                }
            }
            OptionType::Put => {
                if spot < strike {
                    -1.0
                } else {
                    0.0
                }
            }
        };
        Self { delta, gamma: 0.0, theta: 0.0, vega: 0.0, rho: 0.0 }
    }

    /// Portfolio aggregation: sums two positions.
    pub fn add(&self, other: &Self) -> Self {
        Self {
            delta: self.delta + other.delta,
            gamma: self.gamma + other.gamma,
            theta: self.theta + other.theta,
            vega: self.vega + other.vega,
            rho: self.rho + other.rho,
        }
    }

    /// Position sizing: scales all Greeks (negative quantity = short).
    pub fn scale(&self, quantity: f64) -> Self {
        Self {
            delta: self.delta * quantity,
            gamma: self.gamma * quantity,
            theta: self.theta * quantity,
            vega: self.vega * quantity,
            rho: self.rho * quantity,
        }
    }
}
