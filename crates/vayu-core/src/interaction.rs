//! # Interaction Rules
//!
//! Pairwise confidence adjustments applied after the agents run and before
//! the gate selects. Rules adjust, never replace: an agent's action survives
//! untouched, only its confidence (and rationale annotation) moves.
//!
//! 1. A high-confidence macro risk-off halves the confidence of any bullish
//!    trend / gamma / volatility signal (symmetric for risk-on vs bearish).
//! 2. Trend and volatility agreeing on a non-HOLD action boosts both 20%.
//! 3. In a trending regime, a reversal signal fighting the trend is
//!    suppressed to 60% of its confidence.
//! 4. A high-confidence non-HOLD delta-hedging signal gets a further boost -
//!    risk management outranks alpha.

use crate::agents::SignalSet;
use crate::config::RouterConfig;
use tracing::debug;
use vayu_models::{Regime, TradeAction};

pub struct InteractionRules;

impl InteractionRules {
    /// Applies all rules in place.
    pub fn apply(signals: &mut SignalSet, regime: Regime, cfg: &RouterConfig) {
        Self::macro_override(signals, cfg);
        Self::trend_volatility_agreement(signals, cfg);
        Self::suppress_reversal_in_trend(signals, regime, cfg);
        Self::prioritize_hedge(signals, cfg);
    }

    /// Rule 1: macro conviction suppresses opposing directional agents.
    fn macro_override(signals: &mut SignalSet, cfg: &RouterConfig) {
        let macro_action = signals.macro_signal.action;
        let macro_conf = signals.macro_signal.confidence;
        if macro_conf <= cfg.macro_override_min_confidence {
            return;
        }

        let (suppressed_action, note) = match macro_action {
            TradeAction::BuyPut => (TradeAction::BuyCall, "[suppressed by risk-off]"),
            TradeAction::BuyCall => (TradeAction::BuyPut, "[suppressed by risk-on]"),
            TradeAction::Hold => return,
        };

        for signal in [&mut signals.trend, &mut signals.gamma, &mut signals.volatility] {
            if signal.action == suppressed_action {
                signal.scale_confidence(cfg.macro_suppression);
                signal.annotate(note);
                debug!("[ROUTER] macro override suppressed {} signal", signal.agent);
            }
        }
    }

    /// Rule 2: independent agreement between trend and volatility is stronger
    /// evidence than either alone.
    fn trend_volatility_agreement(signals: &mut SignalSet, cfg: &RouterConfig) {
        if signals.trend.action == signals.volatility.action && !signals.trend.action.is_hold() {
            for signal in [&mut signals.trend, &mut signals.volatility] {
                signal.confidence =
                    (signal.confidence * cfg.agreement_boost).min(cfg.confidence_cap);
            }
            signals.trend.annotate("[boosted by volatility agreement]");
            signals.volatility.annotate("[boosted by trend agreement]");
        }
    }

    /// Rule 3: contrarian entries underperform while a trend is running.
    fn suppress_reversal_in_trend(signals: &mut SignalSet, regime: Regime, cfg: &RouterConfig) {
        if regime == Regime::Trending && signals.reversal.action != signals.trend.action {
            signals.reversal.scale_confidence(cfg.reversal_suppression);
            signals.reversal.annotate("[suppressed in trending market]");
        }
    }

    /// Rule 4: a confident hedge demand is priority-marked above alpha.
    fn prioritize_hedge(signals: &mut SignalSet, cfg: &RouterConfig) {
        if signals.hedge.confidence > cfg.hedge_veto_min_confidence
            && !signals.hedge.action.is_hold()
        {
            signals.hedge.confidence =
                (signals.hedge.confidence * cfg.hedge_priority_boost).min(cfg.confidence_cap);
            signals.hedge.annotate("[priority: risk management]");
        }
    }
}
