//! Gamma-model agent: trades convexity acceleration when ATM gamma is high
//! and short-horizon momentum gives it a direction.

use super::{MarketContext, SignalAgent, ZERO_DTE_YEARS};
use crate::indicators::momentum_pct;
use vayu_models::{AgentKind, AgentSignal, MarketWindow, TradeAction};
use vayu_options::OptionGreeks;

/// Buckets ATM Black-Scholes gamma into high/medium/low convexity and pairs
/// it with 5-bar momentum. Low gamma always yields HOLD - without convexity
/// there is no acceleration to capture, whatever momentum says.
pub struct GammaModelAgent {
    gamma_high: f64,
    gamma_low: f64,
    momentum_bars: usize,
}

impl Default for GammaModelAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl GammaModelAgent {
    pub fn new() -> Self {
        Self { gamma_high: 0.05, gamma_low: 0.01, momentum_bars: 5 }
    }
}

impl SignalAgent for GammaModelAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::GammaModel
    }

    fn analyze(&self, window: &MarketWindow, ctx: &MarketContext) -> AgentSignal {
        if !window.is_warm() {
            return AgentSignal::hold(self.kind(), "insufficient history (<20 bars)");
        }

        let closes = window.closes();
        let spot = match ctx.spot_price(window) {
            Some(s) if s > 0.0 => s,
            _ => return AgentSignal::hold(self.kind(), "no spot price available"),
        };
        let strike = ctx.strike_price(window).unwrap_or_else(|| spot.round());

        let greeks = OptionGreeks::for_call(
            spot,
            strike,
            ZERO_DTE_YEARS,
            ctx.risk_free_rate,
            ctx.implied_vol(),
        );
        let gamma = greeks.gamma;
        let momentum = momentum_pct(&closes, self.momentum_bars);

        if gamma > self.gamma_high {
            if momentum > 0.3 {
                AgentSignal::new(
                    self.kind(),
                    TradeAction::BuyCall,
                    (gamma / 0.1).min(0.95),
                    momentum / 2.0,
                    format!(
                        "gamma acceleration up: gamma {:.4}, momentum {:.2}%",
                        gamma, momentum
                    ),
                )
            } else if momentum < -0.3 {
                AgentSignal::new(
                    self.kind(),
                    TradeAction::BuyPut,
                    (gamma / 0.1).min(0.95),
                    momentum / 2.0,
                    format!(
                        "gamma acceleration down: gamma {:.4}, momentum {:.2}%",
                        gamma, momentum
                    ),
                )
            } else {
                AgentSignal::new(
                    self.kind(),
                    TradeAction::Hold,
                    0.3,
                    0.0,
                    format!("high gamma {:.4} but no momentum ({:.2}%)", gamma, momentum),
                )
            }
        } else if gamma < self.gamma_low {
            AgentSignal::new(
                self.kind(),
                TradeAction::Hold,
                0.7,
                0.0,
                format!("low gamma {:.4}: insufficient convexity", gamma),
            )
        } else if momentum.abs() > 0.5 {
            let action = if momentum > 0.0 { TradeAction::BuyCall } else { TradeAction::BuyPut };
            AgentSignal::new(
                self.kind(),
                action,
                0.6,
                momentum / 2.0,
                format!("medium gamma {:.4} with strong momentum {:.2}%", gamma, momentum),
            )
        } else {
            AgentSignal::new(
                self.kind(),
                TradeAction::Hold,
                0.5,
                0.0,
                format!("medium gamma {:.4}, weak momentum {:.2}%", gamma, momentum),
            )
        }
    }
}
