//! Mean-reversion agent: fades overbought/oversold extremes.

use super::{MarketContext, SignalAgent};
use crate::indicators::{bollinger, rsi, sma_last, stochastic_k};
use vayu_models::{AgentKind, AgentSignal, MarketWindow, TradeAction};

/// Tallies oversold vs overbought evidence from RSI, distance to SMA20/50,
/// Bollinger penetration, and stochastic %K. Oversold resolves to BUY_CALL
/// (expect bounce), overbought to BUY_PUT; threshold ±0.4.
pub struct ReversalAgent {
    strength_threshold: f64,
}

impl Default for ReversalAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl ReversalAgent {
    pub fn new() -> Self {
        Self { strength_threshold: 0.4 }
    }
}

impl SignalAgent for ReversalAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Reversal
    }

    fn analyze(&self, window: &MarketWindow, _ctx: &MarketContext) -> AgentSignal {
        if !window.is_warm() {
            return AgentSignal::hold(self.kind(), "insufficient history (<20 bars)");
        }

        let closes = window.closes();
        let highs = window.highs();
        let lows = window.lows();
        let price = *closes.last().expect("warm window is non-empty");

        let current_rsi = rsi(&closes, 14);
        let sma20 = sma_last(&closes, 20).unwrap_or(price);
        let sma50 = sma_last(&closes, 50.min(closes.len())).unwrap_or(price);
        let dist_sma20 = if sma20 > 0.0 { (price - sma20) / sma20 * 100.0 } else { 0.0 };
        let dist_sma50 = if sma50 > 0.0 { (price - sma50) / sma50 * 100.0 } else { 0.0 };
        let (bb_upper, _, bb_lower) = bollinger(&closes, 20, 2.0).expect("non-empty closes");
        let stoch = stochastic_k(&highs, &lows, price, 14);

        let mut oversold = 0u32;
        let mut overbought = 0u32;

        // RSI extremes carry double weight at the hard bands.
        if current_rsi < 30.0 {
            oversold += 2;
        } else if current_rsi < 40.0 {
            oversold += 1;
        }
        if current_rsi > 70.0 {
            overbought += 2;
        } else if current_rsi > 60.0 {
            overbought += 1;
        }

        if dist_sma20 < -2.0 {
            oversold += 1;
        } else if dist_sma20 > 2.0 {
            overbought += 1;
        }
        if dist_sma50 < -3.0 {
            oversold += 1;
        } else if dist_sma50 > 3.0 {
            overbought += 1;
        }

        if price < bb_lower {
            oversold += 1;
        } else if price > bb_upper {
            overbought += 1;
        }

        if stoch < 20.0 {
            oversold += 1;
        } else if stoch > 80.0 {
            overbought += 1;
        }

        let total = oversold + overbought;
        let strength = if total == 0 {
            0.0
        } else {
            (oversold as f64 - overbought as f64) / total as f64
        };

        if strength > self.strength_threshold {
            AgentSignal::new(
                self.kind(),
                TradeAction::BuyCall,
                (strength.abs() * 1.2).min(0.95),
                strength,
                format!("oversold reversal: RSI {:.1}, {}/{} checks", current_rsi, oversold, total),
            )
        } else if strength < -self.strength_threshold {
            AgentSignal::new(
                self.kind(),
                TradeAction::BuyPut,
                (strength.abs() * 1.2).min(0.95),
                strength,
                format!(
                    "overbought reversal: RSI {:.1}, {}/{} checks",
                    current_rsi, overbought, total
                ),
            )
        } else {
            AgentSignal::new(
                self.kind(),
                TradeAction::Hold,
                1.0 - strength.abs(),
                strength,
                format!("no reversal setup: RSI {:.1}, strength {:.2}", current_rsi, strength),
            )
        }
    }
}
