//! # Ensemble Drift Monitor
//!
//! Watches the stream of routing decisions for signs the ensemble has lost
//! its footing: the regime label churning bar-to-bar, or decision confidence
//! decaying sharply versus the prior window. Consumers treat a drift flag as
//! "reduce size / investigate", not as a trading signal.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::warn;
use vayu_models::{Regime, TradeAction};

/// Why drift was flagged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DriftReason {
    /// More than two distinct regimes inside the last five decisions.
    RegimeChurn { distinct: usize, recent: Vec<Regime> },
    /// Rolling mean confidence dropped more than 30% vs the prior window.
    ConfidenceDecay { recent_avg: f64, earlier_avg: f64 },
}

/// Outcome of one drift check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub detected: bool,
    pub reason: Option<DriftReason>,
}

impl DriftReport {
    fn healthy() -> Self {
        Self { detected: false, reason: None }
    }

    fn flagged(reason: DriftReason) -> Self {
        Self { detected: true, reason: Some(reason) }
    }
}

#[derive(Debug, Clone, Copy)]
struct DecisionSample {
    #[allow(dead_code)]
    action: TradeAction,
    confidence: f64,
    regime: Regime,
}

/// Append-only ring buffer of recent decisions plus the two health checks.
pub struct DriftMonitor {
    samples: VecDeque<DecisionSample>,
    capacity: usize,
}

impl Default for DriftMonitor {
    fn default() -> Self {
        Self::new(50)
    }
}

impl DriftMonitor {
    /// Minimum decisions before any drift verdict is attempted.
    const MIN_SAMPLES: usize = 10;
    /// Distinct regimes tolerated inside the churn lookback.
    const MAX_DISTINCT_REGIMES: usize = 2;
    const CHURN_LOOKBACK: usize = 5;
    /// Recent/earlier confidence ratio below which decay is flagged.
    const DECAY_RATIO: f64 = 0.7;

    pub fn new(capacity: usize) -> Self {
        Self { samples: VecDeque::with_capacity(capacity.max(1)), capacity: capacity.max(1) }
    }

    pub fn record(&mut self, action: TradeAction, confidence: f64, regime: Regime) {
        self.samples.push_back(DecisionSample { action, confidence, regime });
        if self.samples.len() > self.capacity {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Runs both health checks over the recorded window.
    pub fn check(&self) -> DriftReport {
        if self.samples.len() < Self::MIN_SAMPLES {
            return DriftReport::healthy();
        }

        // Regime churn over the last five decisions.
        let recent: Vec<Regime> = self
            .samples
            .iter()
            .rev()
            .take(Self::CHURN_LOOKBACK)
            .map(|s| s.regime)
            .collect();
        let mut distinct: Vec<Regime> = Vec::new();
        for r in &recent {
            if !distinct.contains(r) {
                distinct.push(*r);
            }
        }
        if distinct.len() > Self::MAX_DISTINCT_REGIMES {
            warn!("[DRIFT] regime churn: {} distinct regimes in last {}", distinct.len(), Self::CHURN_LOOKBACK);
            return DriftReport::flagged(DriftReason::RegimeChurn {
                distinct: distinct.len(),
                recent,
            });
        }

        // Confidence decay: newest five vs the five before them.
        let confs: Vec<f64> = self.samples.iter().rev().take(10).map(|s| s.confidence).collect();
        let recent_avg = confs[..5].iter().sum::<f64>() / 5.0;
        let earlier_avg = confs[5..].iter().sum::<f64>() / 5.0;
        if recent_avg < earlier_avg * Self::DECAY_RATIO {
            warn!(
                "[DRIFT] confidence decay: {:.3} vs {:.3} prior window",
                recent_avg, earlier_avg
            );
            return DriftReport::flagged(DriftReason::ConfidenceDecay { recent_avg, earlier_avg });
        }

        DriftReport::healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fill(monitor: &mut DriftMonitor, n: usize, confidence: f64, regime: Regime) {
        for _ in 0..n {
            monitor.record(TradeAction::Hold, confidence, regime);
        }
    }

    #[test]
    fn insufficient_history_reports_healthy() {
        let mut m = DriftMonitor::default();
        fill(&mut m, 9, 0.8, Regime::Trending);
        assert!(!m.check().detected);
    }

    #[test]
    fn stable_stream_is_healthy() {
        let mut m = DriftMonitor::default();
        fill(&mut m, 30, 0.7, Regime::Trending);
        assert!(!m.check().detected);
    }

    #[test]
    fn three_regimes_in_five_decisions_flags_churn() {
        let mut m = DriftMonitor::default();
        fill(&mut m, 10, 0.7, Regime::Trending);
        m.record(TradeAction::Hold, 0.7, Regime::Volatile);
        m.record(TradeAction::Hold, 0.7, Regime::MeanReverting);
        m.record(TradeAction::Hold, 0.7, Regime::Trending);
        let report = m.check();
        assert!(report.detected);
        assert!(matches!(report.reason, Some(DriftReason::RegimeChurn { distinct: 3, .. })));
    }

    #[test]
    fn two_regimes_do_not_flag() {
        let mut m = DriftMonitor::default();
        fill(&mut m, 10, 0.7, Regime::Trending);
        m.record(TradeAction::Hold, 0.7, Regime::Volatile);
        assert!(!m.check().detected);
    }

    #[test]
    fn confidence_collapse_flags_decay() {
        let mut m = DriftMonitor::default();
        fill(&mut m, 5, 0.8, Regime::Neutral);
        fill(&mut m, 5, 0.3, Regime::Neutral); // 0.3 < 0.8 * 0.7
        let report = m.check();
        assert!(report.detected);
        match report.reason {
            Some(DriftReason::ConfidenceDecay { recent_avg, earlier_avg }) => {
                assert!((recent_avg - 0.3).abs() < 1e-9);
                assert!((earlier_avg - 0.8).abs() < 1e-9);
            }
            other => panic!("expected decay, got {:?}", other),
        }
    }

    #[test]
    fn mild_confidence_dip_is_tolerated() {
        let mut m = DriftMonitor::default();
        fill(&mut m, 5, 0.8, Regime::Neutral);
        fill(&mut m, 5, 0.6, Regime::Neutral); // 0.6 > 0.8 * 0.7
        assert!(!m.check().detected);
    }

    #[test]
    fn ring_buffer_is_bounded() {
        let mut m = DriftMonitor::new(20);
        fill(&mut m, 100, 0.5, Regime::Neutral);
        assert_eq!(m.len(), 20);
    }
}
