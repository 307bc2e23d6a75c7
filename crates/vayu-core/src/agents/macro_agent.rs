//! Macro risk-on/risk-off agent: reads the volatility index against
//! short-term momentum and trend direction.

use super::{MarketContext, SignalAgent};
use crate::indicators::{ema_last, momentum_pct, trend_strength};
use vayu_models::{AgentKind, AgentSignal, MarketWindow, TradeAction};

/// Tallies risk-on vs risk-off evidence: vol-index level (double weight at
/// the hard bands), momentum aligned with trend direction (double weight),
/// and trend-strength magnitude. Threshold ±0.3; risk-on resolves to
/// BUY_CALL, risk-off to BUY_PUT.
pub struct MacroAgent {
    vol_index_low: f64,
    vol_index_high: f64,
    strength_threshold: f64,
}

impl Default for MacroAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl MacroAgent {
    pub fn new() -> Self {
        Self { vol_index_low: 18.0, vol_index_high: 25.0, strength_threshold: 0.3 }
    }
}

impl SignalAgent for MacroAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Macro
    }

    fn analyze(&self, window: &MarketWindow, ctx: &MarketContext) -> AgentSignal {
        if !window.is_warm() {
            return AgentSignal::hold(self.kind(), "insufficient history (<20 bars)");
        }

        let closes = window.closes();
        let momentum = momentum_pct(&closes, 5);
        let ema9 = ema_last(&closes, 9).unwrap_or_default();
        let ema20 = ema_last(&closes, 20).unwrap_or_default();
        let trend_up = ema9 > ema20;
        let trend_mag = trend_strength(&closes).abs();

        let mut risk_on = 0u32;
        let mut risk_off = 0u32;

        if ctx.vol_index < self.vol_index_low {
            risk_on += 2;
        } else if ctx.vol_index > self.vol_index_high {
            risk_off += 2;
        }

        if momentum > 0.5 && trend_up {
            risk_on += 2;
        } else if momentum < -0.5 && !trend_up {
            risk_off += 2;
        }

        if trend_mag > 0.01 {
            if trend_up {
                risk_on += 1;
            } else {
                risk_off += 1;
            }
        }

        let total = risk_on + risk_off;
        let strength =
            if total == 0 { 0.0 } else { (risk_on as f64 - risk_off as f64) / total as f64 };

        if strength > self.strength_threshold {
            AgentSignal::new(
                self.kind(),
                TradeAction::BuyCall,
                (strength.abs() * 1.2).min(0.95),
                strength,
                format!(
                    "risk-on: vol index {:.1}, momentum {:.2}%, {}/{} checks",
                    ctx.vol_index, momentum, risk_on, total
                ),
            )
        } else if strength < -self.strength_threshold {
            AgentSignal::new(
                self.kind(),
                TradeAction::BuyPut,
                (strength.abs() * 1.2).min(0.95),
                strength,
                format!(
                    "risk-off: vol index {:.1}, momentum {:.2}%, {}/{} checks",
                    ctx.vol_index, momentum, risk_off, total
                ),
            )
        } else {
            AgentSignal::new(
                self.kind(),
                TradeAction::Hold,
                1.0 - strength.abs(),
                strength,
                format!(
                    "neutral macro: vol index {:.1}, momentum {:.2}%, strength {:.2}",
                    ctx.vol_index, momentum, strength
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rally(n: usize) -> MarketWindow {
        MarketWindow::from_closes(&(0..n).map(|i| 400.0 * 1.01f64.powi(i as i32)).collect::<Vec<_>>())
    }

    fn selloff(n: usize) -> MarketWindow {
        MarketWindow::from_closes(&(0..n).map(|i| 400.0 * 0.99f64.powi(i as i32)).collect::<Vec<_>>())
    }

    #[test]
    fn calm_vol_and_rally_reads_risk_on() {
        let s = MacroAgent::new().analyze(&rally(60), &MarketContext::new(14.0));
        assert_eq!(s.action, TradeAction::BuyCall);
        assert!(s.confidence > 0.9, "unanimous risk-on evidence: {}", s.confidence);
    }

    #[test]
    fn stressed_vol_and_selloff_reads_risk_off() {
        let s = MacroAgent::new().analyze(&selloff(60), &MarketContext::new(32.0));
        assert_eq!(s.action, TradeAction::BuyPut);
        assert!(s.strength < -0.9);
    }

    #[test]
    fn conflicting_evidence_is_neutral() {
        // Rally tape but stressed vol index: +3 on, +2 off -> strength 0.2.
        let s = MacroAgent::new().analyze(&rally(60), &MarketContext::new(32.0));
        assert_eq!(s.action, TradeAction::Hold);
    }

    #[test]
    fn mid_range_vol_flat_tape_is_neutral() {
        let flat = MarketWindow::from_closes(&vec![400.0; 40]);
        let s = MacroAgent::new().analyze(&flat, &MarketContext::new(20.0));
        assert_eq!(s.action, TradeAction::Hold);
        assert_eq!(s.strength, 0.0);
    }
}
