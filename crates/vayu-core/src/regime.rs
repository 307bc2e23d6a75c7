//! # Regime Classifier
//!
//! Labels the current tape from trend strength, realized volatility, RSI, and
//! the external volatility index. First matching rule wins:
//!
//! 1. strong trend + contained vol  -> `Trending`
//! 2. elevated realized vol or vol index -> `Volatile`
//! 3. neutral RSI + weak trend -> `MeanReverting`
//! 4. otherwise -> `Neutral`
//!
//! Classification is per-call and carries no hysteresis by default: the label
//! can flip on consecutive bars. That is a deliberate simplicity/noise
//! trade-off inherited from the production tuning. An opt-in confirmation
//! filter ([`RegimeClassifier::with_hysteresis`]) requires N consecutive
//! identical raw classifications before the published label switches.
//!
//! `Chaos` and `Calm` are never produced here; they enter the router as
//! caller-pinned regimes (outer circuit breakers, session schedulers).

use crate::config::RouterConfig;
use crate::indicators;
use vayu_models::{MarketWindow, Regime};

/// Stateless by default; holds a confirmation streak only when the
/// hysteresis extension is enabled.
#[derive(Debug, Clone)]
pub struct RegimeClassifier {
    /// Consecutive identical classifications required to switch labels.
    /// `None` reproduces the original flip-per-bar behavior.
    hysteresis: Option<usize>,
    current: Regime,
    streak_regime: Regime,
    streak_len: usize,
}

impl Default for RegimeClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RegimeClassifier {
    pub fn new() -> Self {
        Self {
            hysteresis: None,
            current: Regime::Neutral,
            streak_regime: Regime::Neutral,
            streak_len: 0,
        }
    }

    /// Optional extension: require `n` consecutive identical raw
    /// classifications before the published regime changes. `n <= 1`
    /// disables the filter.
    pub fn with_hysteresis(mut self, n: usize) -> Self {
        self.hysteresis = if n > 1 { Some(n) } else { None };
        self
    }

    /// Pure first-match classification of one window.
    pub fn classify_raw(&self, window: &MarketWindow, vol_index: f64, cfg: &RouterConfig) -> Regime {
        if !window.is_warm() {
            return Regime::Neutral;
        }

        let closes = window.closes();
        let trend = indicators::trend_strength(&closes).abs();
        let vol = indicators::realized_vol_annualized(&closes);
        let rsi = indicators::rsi(&closes, 14);

        if trend > cfg.trend_strength_threshold && vol < cfg.realized_vol_trending_cap_pct {
            Regime::Trending
        } else if vol > cfg.realized_vol_high_pct || vol_index > cfg.vol_index_volatile {
            Regime::Volatile
        } else if rsi > 30.0 && rsi < 70.0 && trend < cfg.weak_trend_threshold {
            Regime::MeanReverting
        } else {
            Regime::Neutral
        }
    }

    /// Classifies one window, applying the confirmation filter if enabled.
    pub fn classify(&mut self, window: &MarketWindow, vol_index: f64, cfg: &RouterConfig) -> Regime {
        let raw = self.classify_raw(window, vol_index, cfg);

        let Some(required) = self.hysteresis else {
            self.current = raw;
            return raw;
        };

        if raw == self.streak_regime {
            self.streak_len += 1;
        } else {
            self.streak_regime = raw;
            self.streak_len = 1;
        }
        if raw == self.current || self.streak_len >= required {
            self.current = raw;
        }
        self.current
    }

    /// Most recent published regime.
    pub fn current(&self) -> Regime {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> RouterConfig {
        RouterConfig::default()
    }

    fn window_of(closes: Vec<f64>) -> MarketWindow {
        MarketWindow::from_closes(&closes)
    }

    /// Steady rally: wide EMA gap, near-zero realized vol.
    fn trending_closes(n: usize) -> Vec<f64> {
        (0..n).map(|i| 400.0 * 1.01f64.powi(i as i32)).collect()
    }

    /// Alternating large swings: realized vol far above 40%.
    fn churning_closes(n: usize) -> Vec<f64> {
        (0..n).map(|i| if i % 2 == 0 { 400.0 } else { 412.0 }).collect()
    }

    #[test]
    fn short_history_is_neutral() {
        let c = RegimeClassifier::new();
        let w = window_of(trending_closes(10));
        assert_eq!(c.classify_raw(&w, 20.0, &cfg()), Regime::Neutral);
    }

    #[test]
    fn steady_rally_classifies_trending() {
        let c = RegimeClassifier::new();
        let w = window_of(trending_closes(60));
        assert_eq!(c.classify_raw(&w, 20.0, &cfg()), Regime::Trending);
    }

    #[test]
    fn large_swings_classify_volatile() {
        let c = RegimeClassifier::new();
        let w = window_of(churning_closes(40));
        assert_eq!(c.classify_raw(&w, 20.0, &cfg()), Regime::Volatile);
    }

    #[test]
    fn elevated_vol_index_alone_classifies_volatile() {
        let c = RegimeClassifier::new();
        // Drifting tape, tiny alternating moves keep RSI mid-range and realized vol low.
        let closes: Vec<f64> =
            (0..40).map(|i| 400.0 + if i % 2 == 0 { 0.05 } else { -0.05 }).collect();
        assert_eq!(c.classify_raw(&window_of(closes), 35.0, &cfg()), Regime::Volatile);
    }

    #[test]
    fn quiet_mid_range_tape_mean_reverts() {
        let c = RegimeClassifier::new();
        let closes: Vec<f64> =
            (0..40).map(|i| 400.0 + if i % 2 == 0 { 0.05 } else { -0.05 }).collect();
        assert_eq!(c.classify_raw(&window_of(closes), 18.0, &cfg()), Regime::MeanReverting);
    }

    #[test]
    fn hysteresis_requires_confirmation() {
        let mut c = RegimeClassifier::new().with_hysteresis(3);
        let trending = window_of(trending_closes(60));
        let volatile = window_of(churning_closes(40));

        for _ in 0..3 {
            c.classify(&trending, 20.0, &cfg());
        }
        assert_eq!(c.current(), Regime::Trending);

        // One volatile print is not enough to switch...
        assert_eq!(c.classify(&volatile, 20.0, &cfg()), Regime::Trending);
        assert_eq!(c.classify(&volatile, 20.0, &cfg()), Regime::Trending);
        // ...the third consecutive one is.
        assert_eq!(c.classify(&volatile, 20.0, &cfg()), Regime::Volatile);
    }

    #[test]
    fn no_hysteresis_flips_immediately() {
        let mut c = RegimeClassifier::new();
        let trending = window_of(trending_closes(60));
        let volatile = window_of(churning_closes(40));
        assert_eq!(c.classify(&trending, 20.0, &cfg()), Regime::Trending);
        assert_eq!(c.classify(&volatile, 20.0, &cfg()), Regime::Volatile);
    }
}
