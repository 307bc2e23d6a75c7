//! # Meta-Policy Router
//!
//! The gating ensemble. Averaging opposing agents produces a falsely-neutral
//! "do nothing" - a strong bullish trend read and a strong bearish reversal
//! read would cancel, missing genuine setups in both directions. This router
//! therefore *selects*: it classifies the regime, trusts the agent(s) with
//! edge in that regime, and ignores the rest. Two hard vetoes run after
//! gating regardless of which path fired.
//!
//! Every decision carries `gating_source` (which rule path fired) and the
//! full per-agent breakdown, so any fill can be audited back to the exact
//! opinions that produced it.

use crate::agents::{AgentBench, MarketContext, SignalSet};
use crate::config::RouterConfig;
use crate::drift::{DriftMonitor, DriftReport};
use crate::interaction::InteractionRules;
use crate::regime::RegimeClassifier;
use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;
use vayu_models::{AgentKind, MarketWindow, Regime, RoutingDecision, TradeAction};

/// Per-agent realized outcome tally, updated by the caller as trades close.
#[derive(Debug, Clone, Copy, Default)]
pub struct AgentPerformance {
    pub wins: u64,
    pub losses: u64,
}

impl AgentPerformance {
    pub fn total(&self) -> u64 {
        self.wins + self.losses
    }
}

/// Caller-owned decision router. Construct one per session or backtest and
/// pass it by reference; there is no global instance.
pub struct MetaRouter {
    config: RouterConfig,
    classifier: RegimeClassifier,
    bench: AgentBench,
    drift: DriftMonitor,
    performance: [AgentPerformance; 6],
}

impl Default for MetaRouter {
    fn default() -> Self {
        Self::new(RouterConfig::default()).expect("default config is valid")
    }
}

impl MetaRouter {
    pub fn new(config: RouterConfig) -> anyhow::Result<Self> {
        config.validate()?;
        let drift = DriftMonitor::new(config.decision_history_cap);
        Ok(Self {
            config,
            classifier: RegimeClassifier::new(),
            bench: AgentBench::new(),
            drift,
            performance: [AgentPerformance::default(); 6],
        })
    }

    /// Swaps in a classifier variant (e.g. one with hysteresis enabled).
    pub fn with_classifier(mut self, classifier: RegimeClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Full pipeline for one bar: classify regime, run the six agents, apply
    /// interaction rules, gate, veto, record.
    pub fn route(&mut self, window: &MarketWindow, ctx: &MarketContext) -> RoutingDecision {
        let regime = self.classifier.classify(window, ctx.vol_index, &self.config);
        let mut signals = self.bench.analyze_all(window, ctx);
        InteractionRules::apply(&mut signals, regime, &self.config);
        self.gate(signals, regime, ctx.vol_index)
    }

    /// Gating and vetoes over already-produced signals.
    ///
    /// Public so outer layers can pin a regime the classifier never emits
    /// (`Chaos` from a circuit breaker, `Calm` from a session scheduler) and
    /// so the rule paths can be exercised directly.
    pub fn gate(&mut self, signals: SignalSet, regime: Regime, vol_index: f64) -> RoutingDecision {
        let cfg = &self.config;

        let mut action = TradeAction::Hold;
        let mut confidence;
        let mut source: String;
        let mut selected: Vec<AgentKind> = Vec::new();

        if regime == Regime::Chaos {
            // 1. Hard veto: unclassifiable tape is never traded.
            confidence = 0.0;
            source = "CHAOS_REGIME_VETO".to_string();
        } else if regime == Regime::Volatile || vol_index > cfg.vol_index_high {
            // 2. High volatility: trend/reversal reads are unreliable, only
            //    the volatility agent is trusted.
            if signals.volatility.confidence > cfg.vol_agent_min_confidence {
                action = signals.volatility.action;
                confidence = signals.volatility.confidence;
                source = "VOL_AGENT_SELECTED".to_string();
                selected.push(AgentKind::Volatility);
            } else {
                confidence = cfg.fallback_hold_confidence;
                source = "HIGH_VOL_NO_SIGNAL".to_string();
            }
        } else if regime == Regime::Trending {
            // 3. Trending: trust trend; a strong macro read is the discounted
            //    backup; reversal is deliberately ignored.
            if signals.trend.confidence > cfg.trend_agent_min_confidence {
                action = signals.trend.action;
                confidence = signals.trend.confidence;
                source = "TREND_AGENT_SELECTED".to_string();
                selected.push(AgentKind::Trend);
            } else if signals.macro_signal.confidence > cfg.macro_backup_min_confidence {
                action = signals.macro_signal.action;
                confidence = signals.macro_signal.confidence * cfg.macro_backup_discount;
                source = "MACRO_BACKUP_TRENDING".to_string();
                selected.push(AgentKind::Macro);
            } else {
                confidence = cfg.fallback_hold_confidence;
                source = "TREND_REGIME_NO_SIGNAL".to_string();
            }
        } else if regime == Regime::MeanReverting {
            // 4. Mean reverting: trust reversal, ignore trend.
            if signals.reversal.confidence > cfg.reversal_agent_min_confidence {
                action = signals.reversal.action;
                confidence = signals.reversal.confidence;
                source = "REVERSAL_AGENT_SELECTED".to_string();
                selected.push(AgentKind::Reversal);
            } else {
                confidence = cfg.fallback_hold_confidence;
                source = "REVERSAL_REGIME_NO_SIGNAL".to_string();
            }
        } else if regime == Regime::Calm || vol_index < cfg.vol_index_calm {
            // 5. Calm tape: only exceptional conviction earns a trade.
            if signals.volatility.confidence > cfg.calm_breakout_min_confidence {
                action = signals.volatility.action;
                confidence = signals.volatility.confidence;
                source = "CALM_VOL_BREAKOUT".to_string();
                selected.push(AgentKind::Volatility);
            } else if signals.reversal.confidence > cfg.calm_reversal_min_confidence {
                action = signals.reversal.action;
                confidence = signals.reversal.confidence * cfg.calm_reversal_discount;
                source = "CALM_REVERSAL".to_string();
                selected.push(AgentKind::Reversal);
            } else {
                confidence = cfg.fallback_hold_confidence;
                source = "CALM_NO_SIGNAL".to_string();
            }
        } else {
            // 6. Mixed/neutral: require independent consensus.
            let votes = |wanted: TradeAction| {
                signals
                    .iter()
                    .into_iter()
                    .filter(|s| s.action == wanted && s.confidence > cfg.consensus_min_confidence)
                    .count()
            };
            // Confidence pools every same-action opinion, strong or weak,
            // over the count of qualifying votes.
            let pooled = |wanted: TradeAction, n: usize| {
                signals
                    .iter()
                    .into_iter()
                    .filter(|s| s.action == wanted)
                    .map(|s| s.confidence)
                    .sum::<f64>()
                    / n.max(1) as f64
            };

            let call_votes = votes(TradeAction::BuyCall);
            let put_votes = votes(TradeAction::BuyPut);

            if call_votes >= cfg.consensus_votes {
                action = TradeAction::BuyCall;
                confidence = pooled(TradeAction::BuyCall, call_votes);
                source = "CONSENSUS_BUY_CALL".to_string();
                selected.extend(self.voters(&signals, TradeAction::BuyCall));
            } else if put_votes >= cfg.consensus_votes {
                action = TradeAction::BuyPut;
                confidence = pooled(TradeAction::BuyPut, put_votes);
                source = "CONSENSUS_BUY_PUT".to_string();
                selected.extend(self.voters(&signals, TradeAction::BuyPut));
            } else {
                confidence = cfg.fallback_hold_confidence;
                source = "NO_CONSENSUS".to_string();
            }
        }

        // --- Hard vetoes, applied to every path above ---

        // A confident hedging HOLD means exposure must not grow: override
        // any directional pick.
        if signals.hedge.action.is_hold()
            && signals.hedge.confidence > cfg.hedge_veto_min_confidence
            && !action.is_hold()
        {
            debug!("[ROUTER] delta veto fired over {}", source);
            action = TradeAction::Hold;
            confidence = cfg.hedge_veto_confidence;
            source = format!("DELTA_VETO (was {})", source);
            selected.clear();
            selected.push(AgentKind::DeltaHedging);
        }

        // Low gamma-agent confidence marks high uncertainty about convexity:
        // discount whatever survived.
        if signals.gamma.confidence < cfg.gamma_uncertainty_threshold {
            confidence *= cfg.gamma_uncertainty_discount;
            source.push_str("_GAMMA_PENALIZED");
        }

        let confidence = confidence.clamp(0.0, 1.0);
        let decision = RoutingDecision {
            decision_id: Uuid::new_v4(),
            timestamp: Utc::now(),
            action,
            confidence,
            regime,
            gating_source: source,
            agents: signals.to_verdicts(|kind| selected.contains(&kind)),
        };

        self.drift.record(decision.action, decision.confidence, decision.regime);
        info!(
            "[ROUTER] {} regime={} conf={:.2} via {}",
            match decision.action {
                TradeAction::Hold => "HOLD",
                TradeAction::BuyCall => "BUY_CALL",
                TradeAction::BuyPut => "BUY_PUT",
            },
            decision.regime,
            decision.confidence,
            decision.gating_source
        );
        decision
    }

    fn voters(&self, signals: &SignalSet, wanted: TradeAction) -> Vec<AgentKind> {
        signals
            .iter()
            .into_iter()
            .filter(|s| s.action == wanted && s.confidence > self.config.consensus_min_confidence)
            .map(|s| s.agent)
            .collect()
    }

    /// Current ensemble health verdict.
    pub fn check_drift(&self) -> DriftReport {
        self.drift.check()
    }

    /// Records a closed trade outcome against the agent that drove it.
    pub fn record_outcome(&mut self, agent: AgentKind, pnl: f64) {
        let slot = &mut self.performance[Self::perf_index(agent)];
        if pnl > 0.0 {
            slot.wins += 1;
        } else {
            slot.losses += 1;
        }
    }

    pub fn performance(&self, agent: AgentKind) -> AgentPerformance {
        self.performance[Self::perf_index(agent)]
    }

    fn perf_index(agent: AgentKind) -> usize {
        match agent {
            AgentKind::Trend => 0,
            AgentKind::Reversal => 1,
            AgentKind::Volatility => 2,
            AgentKind::GammaModel => 3,
            AgentKind::DeltaHedging => 4,
            AgentKind::Macro => 5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vayu_models::AgentSignal;

    fn signal(agent: AgentKind, action: TradeAction, confidence: f64) -> AgentSignal {
        AgentSignal::new(agent, action, confidence, 0.0, "test")
    }

    fn all_hold() -> SignalSet {
        SignalSet {
            trend: signal(AgentKind::Trend, TradeAction::Hold, 0.5),
            reversal: signal(AgentKind::Reversal, TradeAction::Hold, 0.5),
            volatility: signal(AgentKind::Volatility, TradeAction::Hold, 0.5),
            gamma: signal(AgentKind::GammaModel, TradeAction::Hold, 0.5),
            hedge: signal(AgentKind::DeltaHedging, TradeAction::Hold, 0.5),
            macro_signal: signal(AgentKind::Macro, TradeAction::Hold, 0.5),
        }
    }

    #[test]
    fn volatile_regime_selects_volatility_agent() {
        let mut router = MetaRouter::default();
        let mut set = all_hold();
        set.volatility = signal(AgentKind::Volatility, TradeAction::BuyPut, 0.8);
        let d = router.gate(set, Regime::Volatile, 28.0);
        assert_eq!(d.action, TradeAction::BuyPut);
        assert_eq!(d.gating_source, "VOL_AGENT_SELECTED");
    }

    #[test]
    fn high_vol_index_routes_volatile_even_in_neutral_regime() {
        let mut router = MetaRouter::default();
        let mut set = all_hold();
        // Trend is confident but untrusted above the vol-index band.
        set.trend = signal(AgentKind::Trend, TradeAction::BuyCall, 0.9);
        let d = router.gate(set, Regime::Neutral, 27.0);
        assert_eq!(d.action, TradeAction::Hold);
        assert_eq!(d.gating_source, "HIGH_VOL_NO_SIGNAL");
    }

    #[test]
    fn trending_falls_back_to_discounted_macro() {
        let mut router = MetaRouter::default();
        let mut set = all_hold();
        set.trend = signal(AgentKind::Trend, TradeAction::BuyCall, 0.4);
        set.macro_signal = signal(AgentKind::Macro, TradeAction::BuyCall, 0.9);
        let d = router.gate(set, Regime::Trending, 20.0);
        assert_eq!(d.action, TradeAction::BuyCall);
        assert_eq!(d.gating_source, "MACRO_BACKUP_TRENDING");
        assert!((d.confidence - 0.72).abs() < 1e-9);
    }

    #[test]
    fn mean_reverting_selects_reversal() {
        let mut router = MetaRouter::default();
        let mut set = all_hold();
        set.reversal = signal(AgentKind::Reversal, TradeAction::BuyCall, 0.7);
        let d = router.gate(set, Regime::MeanReverting, 20.0);
        assert_eq!(d.action, TradeAction::BuyCall);
        assert_eq!(d.gating_source, "REVERSAL_AGENT_SELECTED");
    }

    #[test]
    fn calm_requires_exceptional_conviction() {
        let mut router = MetaRouter::default();
        let mut set = all_hold();
        set.volatility = signal(AgentKind::Volatility, TradeAction::BuyCall, 0.7);
        set.reversal = signal(AgentKind::Reversal, TradeAction::BuyPut, 0.7);
        let d = router.gate(set.clone(), Regime::Calm, 15.0);
        assert_eq!(d.action, TradeAction::Hold);
        assert_eq!(d.gating_source, "CALM_NO_SIGNAL");

        set.reversal = signal(AgentKind::Reversal, TradeAction::BuyPut, 0.8);
        let d = router.gate(set, Regime::Calm, 15.0);
        assert_eq!(d.action, TradeAction::BuyPut);
        assert_eq!(d.gating_source, "CALM_REVERSAL");
        assert!((d.confidence - 0.64).abs() < 1e-9);
    }

    #[test]
    fn low_vol_index_routes_calm_path() {
        let mut router = MetaRouter::default();
        let mut set = all_hold();
        set.volatility = signal(AgentKind::Volatility, TradeAction::BuyCall, 0.85);
        let d = router.gate(set, Regime::Neutral, 10.0);
        assert_eq!(d.gating_source, "CALM_VOL_BREAKOUT");
    }

    #[test]
    fn selected_flag_marks_gated_agent_only() {
        let mut router = MetaRouter::default();
        let mut set = all_hold();
        set.volatility = signal(AgentKind::Volatility, TradeAction::BuyPut, 0.8);
        let d = router.gate(set, Regime::Volatile, 28.0);
        for verdict in &d.agents {
            assert_eq!(verdict.selected, verdict.agent == AgentKind::Volatility);
        }
    }

    #[test]
    fn performance_tracker_counts_outcomes() {
        let mut router = MetaRouter::default();
        router.record_outcome(AgentKind::Trend, 120.0);
        router.record_outcome(AgentKind::Trend, -80.0);
        router.record_outcome(AgentKind::Trend, 40.0);
        let perf = router.performance(AgentKind::Trend);
        assert_eq!(perf.wins, 2);
        assert_eq!(perf.losses, 1);
        assert_eq!(router.performance(AgentKind::Macro).total(), 0);
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = RouterConfig { consensus_votes: 0, ..Default::default() };
        assert!(MetaRouter::new(cfg).is_err());
    }
}
