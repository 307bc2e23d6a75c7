//! # QuantVayu Shared Data Model
//!
//! Plain-data record types exchanged between the regime classifier, the
//! specialized agents, the meta-policy router, and the fill engine.
//!
//! ## Description
//! Everything here is a value type: created by one layer, read by the next,
//! and serializable so the orchestration layer can persist decision and
//! execution records. The agent set is fixed at compile time, so agents are
//! addressed through the closed [`AgentKind`] enum rather than string keys.
//!
//! ## Invariants
//! - `confidence` is always finite and within `[0, 1]`
//! - `strength` is always finite and within `[-1, 1]`
//! - `TradeAction` is exactly one of three values
//!
//! Both numeric ranges are enforced at construction time by
//! [`AgentSignal::new`]; an out-of-range input anywhere upstream can never
//! corrupt a routing decision.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Convenience constructor for bars where only the close matters.
    pub fn from_close(close: f64) -> Self {
        Self { open: close, high: close, low: close, close, volume: 0.0 }
    }
}

/// An ordered window of bars, most-recent last.
///
/// Owned by the caller; the classifier and agents only read it. Agents
/// require at least [`MarketWindow::MIN_BARS`] bars before producing a
/// non-trivial signal and degrade to a confidence-0 HOLD below that.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketWindow {
    bars: Vec<Bar>,
}

impl MarketWindow {
    /// Minimum history before any agent or the classifier acts.
    pub const MIN_BARS: usize = 20;

    pub fn new(bars: Vec<Bar>) -> Self {
        Self { bars }
    }

    /// Build a window from close prices alone (tests, synthetic feeds).
    pub fn from_closes(closes: &[f64]) -> Self {
        Self { bars: closes.iter().map(|&c| Bar::from_close(c)).collect() }
    }

    pub fn push(&mut self, bar: Bar) {
        self.bars.push(bar);
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// True once enough history has accumulated for signal generation.
    pub fn is_warm(&self) -> bool {
        self.bars.len() >= Self::MIN_BARS
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn latest(&self) -> Option<&Bar> {
        self.bars.last()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    pub fn volumes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.volume).collect()
    }
}

/// Final (and per-agent) trading action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TradeAction {
    /// Stay flat / do nothing this bar.
    Hold,
    /// Buy a call (bullish directional or call-side hedge).
    BuyCall,
    /// Buy a put (bearish directional or put-side hedge).
    BuyPut,
}

impl TradeAction {
    pub fn is_hold(&self) -> bool {
        matches!(self, TradeAction::Hold)
    }
}

/// The six fixed specialized agents.
///
/// A closed enum instead of name strings: the agent set is known at compile
/// time, and a misspelled key becomes a compile error instead of a silent
/// runtime miss.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Trend,
    Reversal,
    Volatility,
    GammaModel,
    DeltaHedging,
    Macro,
}

impl AgentKind {
    pub const ALL: [AgentKind; 6] = [
        AgentKind::Trend,
        AgentKind::Reversal,
        AgentKind::Volatility,
        AgentKind::GammaModel,
        AgentKind::DeltaHedging,
        AgentKind::Macro,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::Trend => "trend",
            AgentKind::Reversal => "reversal",
            AgentKind::Volatility => "volatility",
            AgentKind::GammaModel => "gamma_model",
            AgentKind::DeltaHedging => "delta_hedging",
            AgentKind::Macro => "macro",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opinion emitted by one specialized agent for one bar.
///
/// Created fresh on every evaluation call. After construction only the
/// interaction-rule layer mutates it, and only through
/// [`AgentSignal::scale_confidence`] / [`AgentSignal::annotate`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSignal {
    pub agent: AgentKind,
    pub action: TradeAction,
    /// Conviction in `[0, 1]`.
    pub confidence: f64,
    /// Signed evidence balance in `[-1, 1]` (positive = bullish).
    pub strength: f64,
    /// Human-readable explanation of how the opinion was formed.
    pub rationale: String,
}

impl AgentSignal {
    /// Builds a signal with `confidence` and `strength` defensively clamped
    /// to their invariant ranges. Non-finite inputs collapse to zero.
    pub fn new(
        agent: AgentKind,
        action: TradeAction,
        confidence: f64,
        strength: f64,
        rationale: impl Into<String>,
    ) -> Self {
        let confidence = if confidence.is_finite() { confidence.clamp(0.0, 1.0) } else { 0.0 };
        let strength = if strength.is_finite() { strength.clamp(-1.0, 1.0) } else { 0.0 };
        Self { agent, action, confidence, strength, rationale: rationale.into() }
    }

    /// The degraded answer for insufficient history or missing inputs.
    pub fn hold(agent: AgentKind, rationale: impl Into<String>) -> Self {
        Self::new(agent, TradeAction::Hold, 0.0, 0.0, rationale)
    }

    /// Scales confidence by `factor`, keeping the `[0, 1]` invariant.
    /// Reserved for the interaction-rule layer.
    pub fn scale_confidence(&mut self, factor: f64) {
        self.confidence = (self.confidence * factor).clamp(0.0, 1.0);
    }

    /// Appends an interaction-rule note to the rationale.
    pub fn annotate(&mut self, note: &str) {
        self.rationale.push(' ');
        self.rationale.push_str(note);
    }
}

/// Coarse market behavior label used to decide which agent to trust.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Regime {
    /// Strong directional movement, low volatility.
    Trending,
    /// Neutral RSI, weak trend; fade moves.
    MeanReverting,
    /// Realized or implied volatility elevated.
    Volatile,
    /// Very quiet tape; require exceptional conviction to act.
    Calm,
    /// Circuit-breaker state pinned by an outer risk layer; never traded.
    Chaos,
    /// Nothing matched; fall back to consensus.
    Neutral,
}

impl std::fmt::Display for Regime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Regime::Trending => "trending",
            Regime::MeanReverting => "mean_reverting",
            Regime::Volatile => "volatile",
            Regime::Calm => "calm",
            Regime::Chaos => "chaos",
            Regime::Neutral => "neutral",
        };
        f.write_str(s)
    }
}

/// Per-agent line item inside a [`RoutingDecision`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentVerdict {
    pub agent: AgentKind,
    pub action: TradeAction,
    pub confidence: f64,
    pub strength: f64,
    pub rationale: String,
    /// Whether this agent's opinion was the one the gate selected.
    pub selected: bool,
}

/// The router's sole output: final action plus the complete audit trail.
/// Immutable once produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub decision_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub action: TradeAction,
    pub confidence: f64,
    pub regime: Regime,
    /// Which rule path produced this decision (e.g. `TREND_AGENT_SELECTED`,
    /// `CHAOS_REGIME_VETO`, `DELTA_VETO (was ...)`).
    pub gating_source: String,
    pub agents: Vec<AgentVerdict>,
}

/// Side of an order handed to the fill engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSide {
    Buy,
    Sell,
}

/// Inputs for one realistic-fill computation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillRequest {
    /// Quoted midpoint price.
    pub mid: f64,
    pub bid: f64,
    pub ask: f64,
    /// Order quantity in contracts.
    pub qty: u32,
    pub side: OrderSide,
    /// Hours remaining to expiry (full 0DTE session = 6.5).
    pub time_to_expiry_hours: f64,
    /// External volatility index reading (VIX-style).
    pub vol_index: f64,
    /// Recent traded volume in contracts; 0 = unknown.
    pub volume: u64,
    /// Earnings / news flag: doubles market-maker uncertainty and arms the
    /// IV-collapse impact.
    pub has_event: bool,
    /// Net market gamma exposure (positive = long-gamma squeeze risk).
    pub gamma_exposure: f64,
    /// Fraction of resting liquidity assumed hidden, `[0, 1]`.
    pub hidden_liquidity_pct: f64,
}

/// One realistic fill plus the decomposition of its deviation from mid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillResult {
    pub fill_id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub fill_price: f64,
    /// `|fill_price - mid|`, always non-negative.
    pub slippage: f64,
    pub slippage_pct: f64,
    pub liquidity_factor: f64,
    pub gamma_impact: f64,
    pub iv_collapse_impact: f64,
    pub theta_impact: f64,
    pub mm_uncertainty: f64,
    /// The raw Gaussian draw applied to the spread component.
    pub randomness: f64,
    /// Set when the quote was unusable (non-positive or inverted) and the
    /// engine fell back to the plain midpoint.
    pub degenerate_quote: bool,
}
