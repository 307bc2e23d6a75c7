//! Delta-hedging agent: watches portfolio delta utilization and proposes the
//! offsetting option when directional exposure crowds the limit.

use super::{MarketContext, SignalAgent, ZERO_DTE_YEARS};
use vayu_models::{AgentKind, AgentSignal, MarketWindow, TradeAction};
use vayu_options::OptionGreeks;

/// Utilization above 80% demands a hedge opposite the net delta sign at high
/// confidence; 50-80% suggests the same hedge at low confidence; below 50%
/// no hedge is needed and the agent reports a deliberate HOLD.
pub struct DeltaHedgingAgent {
    hard_band: f64,
    soft_band: f64,
}

impl Default for DeltaHedgingAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl DeltaHedgingAgent {
    pub fn new() -> Self {
        Self { hard_band: 0.8, soft_band: 0.5 }
    }
}

impl SignalAgent for DeltaHedgingAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::DeltaHedging
    }

    fn analyze(&self, window: &MarketWindow, ctx: &MarketContext) -> AgentSignal {
        if !window.is_warm() {
            return AgentSignal::hold(self.kind(), "insufficient history (<20 bars)");
        }

        let utilization = if ctx.delta_limit > 0.0 {
            ctx.portfolio_delta.abs() / ctx.delta_limit
        } else {
            0.0
        };

        // ATM option delta, reported so the hedging desk can size the offset.
        let atm_delta = ctx
            .spot_price(window)
            .filter(|s| *s > 0.0)
            .map(|spot| {
                let strike = ctx.strike_price(window).unwrap_or_else(|| spot.round());
                OptionGreeks::for_call(
                    spot,
                    strike,
                    ZERO_DTE_YEARS,
                    ctx.risk_free_rate,
                    ctx.implied_vol(),
                )
                .delta
            })
            .unwrap_or(0.5);

        if utilization > self.hard_band {
            let action =
                if ctx.portfolio_delta > 0.0 { TradeAction::BuyPut } else { TradeAction::BuyCall };
            let instrument = if ctx.portfolio_delta > 0.0 { "PUT" } else { "CALL" };
            AgentSignal::new(
                self.kind(),
                action,
                utilization.min(0.95),
                utilization - self.hard_band,
                format!(
                    "delta {:.0} at {:.0}% of limit: hedge with {} (ATM delta {:.2})",
                    ctx.portfolio_delta,
                    utilization * 100.0,
                    instrument,
                    atm_delta
                ),
            )
        } else if utilization > self.soft_band {
            let action =
                if ctx.portfolio_delta > 0.0 { TradeAction::BuyPut } else { TradeAction::BuyCall };
            AgentSignal::new(
                self.kind(),
                action,
                0.4,
                (utilization - self.soft_band) * 2.0,
                format!(
                    "delta {:.0} at {:.0}% of limit: hedge optional",
                    ctx.portfolio_delta,
                    utilization * 100.0
                ),
            )
        } else {
            AgentSignal::new(
                self.kind(),
                TradeAction::Hold,
                0.6,
                0.0,
                format!(
                    "delta {:.0} at {:.0}% of limit: no hedge needed",
                    ctx.portfolio_delta,
                    utilization * 100.0
                ),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> MarketWindow {
        MarketWindow::from_closes(&vec![500.0; 30])
    }

    #[test]
    fn long_delta_over_limit_demands_put_hedge() {
        let ctx = MarketContext::new(20.0).with_portfolio_delta(1_800.0, 2_000.0);
        let s = DeltaHedgingAgent::new().analyze(&window(), &ctx);
        assert_eq!(s.action, TradeAction::BuyPut);
        assert!(s.confidence > 0.8, "90% utilization should be urgent: {}", s.confidence);
    }

    #[test]
    fn short_delta_over_limit_demands_call_hedge() {
        let ctx = MarketContext::new(20.0).with_portfolio_delta(-1_900.0, 2_000.0);
        let s = DeltaHedgingAgent::new().analyze(&window(), &ctx);
        assert_eq!(s.action, TradeAction::BuyCall);
    }

    #[test]
    fn mid_band_suggests_hedge_at_low_confidence() {
        let ctx = MarketContext::new(20.0).with_portfolio_delta(1_300.0, 2_000.0);
        let s = DeltaHedgingAgent::new().analyze(&window(), &ctx);
        assert_eq!(s.action, TradeAction::BuyPut);
        assert_eq!(s.confidence, 0.4);
    }

    #[test]
    fn low_utilization_holds_deliberately() {
        let ctx = MarketContext::new(20.0).with_portfolio_delta(200.0, 2_000.0);
        let s = DeltaHedgingAgent::new().analyze(&window(), &ctx);
        assert_eq!(s.action, TradeAction::Hold);
        assert_eq!(s.confidence, 0.6);
    }
}
