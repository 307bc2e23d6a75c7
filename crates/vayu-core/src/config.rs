//! # Router Configuration
//!
//! Every threshold used by the classifier, interaction rules, gating logic,
//! and vetoes lives here as a named field, so a backtest can sweep them and a
//! session config file can override them without touching code.

use serde::{Deserialize, Serialize};

/// Tunable thresholds for the decision core.
///
/// Defaults reproduce the production 0DTE tuning. All confidence-valued
/// fields are in `[0, 1]`; volatility fields are index points or annualized
/// percent as documented per field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    // --- Regime classifier ---
    /// Normalized EMA9-EMA20 gap above which the tape counts as trending.
    pub trend_strength_threshold: f64,
    /// Gap below which the trend is considered absent (mean-reversion gate).
    pub weak_trend_threshold: f64,
    /// Annualized realized vol (%) above which the regime is volatile.
    pub realized_vol_high_pct: f64,
    /// Realized vol (%) ceiling for the trending classification.
    pub realized_vol_trending_cap_pct: f64,
    /// Vol-index reading above which the regime is volatile.
    pub vol_index_volatile: f64,

    // --- Gating ---
    /// Vol-index level that forces the volatile routing branch.
    pub vol_index_high: f64,
    /// Vol-index level below which the calm routing branch applies.
    pub vol_index_calm: f64,
    pub vol_agent_min_confidence: f64,
    pub trend_agent_min_confidence: f64,
    pub macro_backup_min_confidence: f64,
    /// Discount applied when macro substitutes for an absent trend signal.
    pub macro_backup_discount: f64,
    pub reversal_agent_min_confidence: f64,
    pub calm_breakout_min_confidence: f64,
    pub calm_reversal_min_confidence: f64,
    pub calm_reversal_discount: f64,
    /// Independent same-action votes required on the consensus path.
    pub consensus_votes: usize,
    pub consensus_min_confidence: f64,
    /// Confidence reported on the explicit no-signal HOLD paths.
    pub fallback_hold_confidence: f64,

    // --- Hard vetoes ---
    /// Delta-hedging HOLD above this confidence forces the final HOLD.
    pub hedge_veto_min_confidence: f64,
    /// Confidence reported after a delta veto fires.
    pub hedge_veto_confidence: f64,
    /// Gamma-agent confidence below this marks high uncertainty.
    pub gamma_uncertainty_threshold: f64,
    /// Multiplicative confidence discount applied on gamma uncertainty.
    pub gamma_uncertainty_discount: f64,

    // --- Interaction rules ---
    /// Macro confidence needed before it suppresses opposing agents.
    pub macro_override_min_confidence: f64,
    /// Confidence multiplier applied to suppressed signals.
    pub macro_suppression: f64,
    /// Boost applied when trend and volatility agree on a non-HOLD action.
    pub agreement_boost: f64,
    /// Multiplier applied to reversal when it fights the trend in a trend.
    pub reversal_suppression: f64,
    /// Boost applied to a high-confidence hedge signal (priority marking).
    pub hedge_priority_boost: f64,
    /// Ceiling for any boosted confidence.
    pub confidence_cap: f64,

    // --- Bookkeeping ---
    /// Decisions retained for drift detection (ring buffer).
    pub decision_history_cap: usize,

    // --- Agent context defaults ---
    /// Portfolio delta limit used when the caller supplies none.
    pub delta_limit: f64,
    /// Risk-free rate for the Black-Scholes primitives.
    pub risk_free_rate: f64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            trend_strength_threshold: 0.02,
            weak_trend_threshold: 0.01,
            realized_vol_high_pct: 40.0,
            realized_vol_trending_cap_pct: 30.0,
            vol_index_volatile: 30.0,

            vol_index_high: 25.0,
            vol_index_calm: 12.0,
            vol_agent_min_confidence: 0.6,
            trend_agent_min_confidence: 0.5,
            macro_backup_min_confidence: 0.7,
            macro_backup_discount: 0.8,
            reversal_agent_min_confidence: 0.5,
            calm_breakout_min_confidence: 0.8,
            calm_reversal_min_confidence: 0.75,
            calm_reversal_discount: 0.8,
            consensus_votes: 3,
            consensus_min_confidence: 0.6,
            fallback_hold_confidence: 0.3,

            hedge_veto_min_confidence: 0.8,
            hedge_veto_confidence: 0.2,
            gamma_uncertainty_threshold: 0.3,
            gamma_uncertainty_discount: 0.7,

            macro_override_min_confidence: 0.7,
            macro_suppression: 0.5,
            agreement_boost: 1.2,
            reversal_suppression: 0.6,
            hedge_priority_boost: 1.3,
            confidence_cap: 0.95,

            decision_history_cap: 100,

            delta_limit: 2000.0,
            risk_free_rate: 0.04,
        }
    }
}

impl RouterConfig {
    /// Production 0DTE profile (the defaults).
    pub fn zero_dte() -> Self {
        Self::default()
    }

    /// Conservative profile: earlier volatile gating, stricter consensus,
    /// faster delta veto. Suited to thin books or late-session trading.
    pub fn conservative() -> Self {
        Self {
            vol_index_high: 22.0,
            consensus_min_confidence: 0.7,
            hedge_veto_min_confidence: 0.75,
            ..Self::default()
        }
    }

    /// Rejects malformed setups loudly instead of letting an impossible
    /// threshold silently disable a routing branch.
    pub fn validate(&self) -> anyhow::Result<()> {
        let unit_fields = [
            ("vol_agent_min_confidence", self.vol_agent_min_confidence),
            ("trend_agent_min_confidence", self.trend_agent_min_confidence),
            ("macro_backup_min_confidence", self.macro_backup_min_confidence),
            ("macro_backup_discount", self.macro_backup_discount),
            ("reversal_agent_min_confidence", self.reversal_agent_min_confidence),
            ("calm_breakout_min_confidence", self.calm_breakout_min_confidence),
            ("calm_reversal_min_confidence", self.calm_reversal_min_confidence),
            ("calm_reversal_discount", self.calm_reversal_discount),
            ("consensus_min_confidence", self.consensus_min_confidence),
            ("fallback_hold_confidence", self.fallback_hold_confidence),
            ("hedge_veto_min_confidence", self.hedge_veto_min_confidence),
            ("hedge_veto_confidence", self.hedge_veto_confidence),
            ("gamma_uncertainty_threshold", self.gamma_uncertainty_threshold),
            ("gamma_uncertainty_discount", self.gamma_uncertainty_discount),
            ("macro_override_min_confidence", self.macro_override_min_confidence),
            ("macro_suppression", self.macro_suppression),
            ("reversal_suppression", self.reversal_suppression),
            ("confidence_cap", self.confidence_cap),
        ];
        for (name, v) in unit_fields {
            if !(0.0..=1.0).contains(&v) || !v.is_finite() {
                anyhow::bail!("{} must be in [0, 1], got {}", name, v);
            }
        }
        if self.agreement_boost < 1.0 || self.hedge_priority_boost < 1.0 {
            anyhow::bail!("boost factors must be >= 1.0");
        }
        if self.consensus_votes == 0 || self.consensus_votes > 6 {
            anyhow::bail!("consensus_votes must be in 1..=6, got {}", self.consensus_votes);
        }
        if self.decision_history_cap == 0 {
            anyhow::bail!("decision_history_cap must be positive");
        }
        if self.delta_limit <= 0.0 {
            anyhow::bail!("delta_limit must be positive, got {}", self.delta_limit);
        }
        if self.vol_index_calm >= self.vol_index_high {
            anyhow::bail!(
                "vol_index_calm ({}) must be below vol_index_high ({})",
                self.vol_index_calm,
                self.vol_index_high
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        RouterConfig::default().validate().unwrap();
        RouterConfig::zero_dte().validate().unwrap();
        RouterConfig::conservative().validate().unwrap();
    }

    #[test]
    fn out_of_range_confidence_rejected() {
        let cfg = RouterConfig { trend_agent_min_confidence: 1.5, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn inverted_vol_bands_rejected() {
        let cfg = RouterConfig { vol_index_calm: 30.0, vol_index_high: 25.0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn serde_defaults_fill_missing_fields() {
        let cfg: RouterConfig = serde_json::from_str("{\"vol_index_high\": 28.0}").unwrap();
        assert_eq!(cfg.vol_index_high, 28.0);
        assert_eq!(cfg.consensus_votes, 3);
    }
}
