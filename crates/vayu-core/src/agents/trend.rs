//! Trend-following agent: momentum continuation via EMA stack, MACD, and
//! short-horizon momentum.

use super::{MarketContext, SignalAgent};
use crate::indicators::{ema_last, macd_histogram, momentum_pct};
use vayu_models::{AgentKind, AgentSignal, MarketWindow, TradeAction};

/// Scores six directional conditions into a bull/bear tally.
///
/// Conditions: price vs EMA9, price vs EMA20, EMA9 vs EMA20, EMA20 vs EMA50
/// (EMA50 falls back to EMA20 under 50 bars of history), MACD histogram
/// sign, and 5-bar momentum (double-weighted past ±0.5%). Strength is the
/// normalized tally balance; action flips past ±0.3.
pub struct TrendAgent {
    momentum_bars: usize,
    strength_threshold: f64,
}

impl Default for TrendAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl TrendAgent {
    pub fn new() -> Self {
        Self { momentum_bars: 5, strength_threshold: 0.3 }
    }
}

impl SignalAgent for TrendAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Trend
    }

    fn analyze(&self, window: &MarketWindow, _ctx: &MarketContext) -> AgentSignal {
        if !window.is_warm() {
            return AgentSignal::hold(self.kind(), "insufficient history (<20 bars)");
        }

        let closes = window.closes();
        let price = *closes.last().expect("warm window is non-empty");
        let ema9 = ema_last(&closes, 9).unwrap_or(price);
        let ema20 = ema_last(&closes, 20).unwrap_or(price);
        let ema50 = if closes.len() >= 50 { ema_last(&closes, 50).unwrap_or(ema20) } else { ema20 };
        let macd_hist = macd_histogram(&closes);
        let momentum = momentum_pct(&closes, self.momentum_bars);

        let mut bulls = 0u32;
        let mut bears = 0u32;
        let mut tally = |bullish: bool| if bullish { bulls += 1 } else { bears += 1 };

        tally(price > ema9);
        tally(price > ema20);
        tally(ema9 > ema20);
        tally(ema20 > ema50);
        tally(macd_hist > 0.0);

        // Strong short-horizon momentum counts double.
        if momentum > 0.5 {
            bulls += 2;
        } else if momentum < -0.5 {
            bears += 2;
        }

        let total = (bulls + bears).max(1);
        let strength = (bulls as f64 - bears as f64) / total as f64;

        if strength > self.strength_threshold {
            AgentSignal::new(
                self.kind(),
                TradeAction::BuyCall,
                strength.abs().min(0.95),
                strength,
                format!("bullish trend: {}/{} checks, momentum {:.2}%", bulls, total, momentum),
            )
        } else if strength < -self.strength_threshold {
            AgentSignal::new(
                self.kind(),
                TradeAction::BuyPut,
                strength.abs().min(0.95),
                strength,
                format!("bearish trend: {}/{} checks, momentum {:.2}%", bears, total, momentum),
            )
        } else {
            AgentSignal::new(
                self.kind(),
                TradeAction::Hold,
                1.0 - strength.abs(),
                strength,
                format!("no clear trend: strength {:.2}", strength),
            )
        }
    }
}
