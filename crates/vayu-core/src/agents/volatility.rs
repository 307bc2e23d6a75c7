//! Volatility-breakout agent: trades range escapes confirmed by expanding
//! volatility and volume.

use super::{MarketContext, SignalAgent};
use crate::indicators::{atr, bollinger_width_pct, rolling_max, rolling_min, sma_last};
use vayu_models::{AgentKind, AgentSignal, MarketWindow, TradeAction};

/// Requires both a directional range breakout and ATR expansion above 1.2x
/// its recent average before acting; volume spikes and a stretched vol index
/// add confirmation weight. Threshold ±0.3.
pub struct VolatilityBreakoutAgent {
    range_bars: usize,
    /// Tolerance beyond the prior range before a close counts as a breakout.
    breakout_tolerance: f64,
    strength_threshold: f64,
    /// ATR ratio the action gate demands (tally credit starts at 1.3).
    atr_action_ratio: f64,
}

impl Default for VolatilityBreakoutAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl VolatilityBreakoutAgent {
    pub fn new() -> Self {
        Self {
            range_bars: 20,
            breakout_tolerance: 0.001,
            strength_threshold: 0.3,
            atr_action_ratio: 1.2,
        }
    }
}

impl SignalAgent for VolatilityBreakoutAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::Volatility
    }

    fn analyze(&self, window: &MarketWindow, ctx: &MarketContext) -> AgentSignal {
        if !window.is_warm() {
            return AgentSignal::hold(self.kind(), "insufficient history (<20 bars)");
        }

        let closes = window.closes();
        let highs = window.highs();
        let lows = window.lows();
        let volumes = window.volumes();
        let price = *closes.last().expect("warm window is non-empty");

        // ATR expansion vs its own recent average.
        let atr_series = atr(&highs, &lows, &closes, 14);
        let current_atr = *atr_series.last().expect("non-empty window");
        let avg_atr = sma_last(&atr_series, 10).unwrap_or(current_atr);
        let atr_expansion = if avg_atr > 0.0 { current_atr / avg_atr } else { 1.0 };

        // Bollinger envelope width expansion.
        let bb_widths = bollinger_width_pct(&closes, 20);
        let current_width = *bb_widths.last().expect("non-empty window");
        let avg_width = sma_last(&bb_widths, 10).unwrap_or(current_width);

        // Breakout against the prior range (current bar excluded - a close
        // can never exceed its own high).
        let n = closes.len();
        let range_high = *rolling_max(&highs[..n - 1], self.range_bars)
            .last()
            .expect("window has at least 2 bars");
        let range_low = *rolling_min(&lows[..n - 1], self.range_bars)
            .last()
            .expect("window has at least 2 bars");
        let breakout_up = price > range_high * (1.0 + self.breakout_tolerance);
        let breakout_down = price < range_low * (1.0 - self.breakout_tolerance);

        // Volume spike vs trailing average.
        let current_volume = *volumes.last().expect("non-empty window");
        let avg_volume = sma_last(&volumes, 10).unwrap_or(current_volume);
        let volume_spike = if avg_volume > 0.0 { current_volume / avg_volume } else { 1.0 };

        let vol_index_stretched = ctx.vol_index > 25.0;

        let mut bulls = 0u32;
        let mut bears = 0u32;

        // Raw volatility expansion is direction-agnostic evidence.
        if atr_expansion > 1.3 {
            bulls += 1;
            bears += 1;
        }
        if current_width > avg_width * 1.2 {
            bulls += 1;
            bears += 1;
        }

        if breakout_up {
            bulls += 3;
        } else if breakout_down {
            bears += 3;
        }

        if volume_spike > 1.5 {
            if breakout_up {
                bulls += 2;
            } else if breakout_down {
                bears += 2;
            }
        }

        if vol_index_stretched {
            bulls += 1;
            bears += 1;
        }

        let total = bulls + bears;
        let strength =
            if total == 0 { 0.0 } else { (bulls as f64 - bears as f64) / total as f64 };

        let expanding = atr_expansion > self.atr_action_ratio;
        if strength > self.strength_threshold && expanding {
            AgentSignal::new(
                self.kind(),
                TradeAction::BuyCall,
                (strength.abs() * 1.1).min(0.95),
                strength,
                format!(
                    "upward breakout: ATR expansion {:.2}x, {}/{} checks, volume {:.1}x",
                    atr_expansion, bulls, total, volume_spike
                ),
            )
        } else if strength < -self.strength_threshold && expanding {
            AgentSignal::new(
                self.kind(),
                TradeAction::BuyPut,
                (strength.abs() * 1.1).min(0.95),
                strength,
                format!(
                    "downward breakout: ATR expansion {:.2}x, {}/{} checks, volume {:.1}x",
                    atr_expansion, bears, total, volume_spike
                ),
            )
        } else {
            AgentSignal::new(
                self.kind(),
                TradeAction::Hold,
                1.0 - strength.abs(),
                strength,
                format!("no breakout: ATR expansion {:.2}x, strength {:.2}", atr_expansion, strength),
            )
        }
    }
}
