//! # QuantVayu Decision Core
//!
//! Regime-gated multi-agent signal routing for intraday options trading.
//!
//! ## Description
//! Six specialized, stateless signal agents each read the same market window
//! and volatility-index reading and emit an opinion. An interaction-rule
//! layer adjusts agent confidences for known pairwise relationships, and the
//! meta-policy router then *selects* the agent(s) trusted in the detected
//! regime - it never averages opposing opinions into a false neutral.
//!
//! ## Architecture
//! ```text
//! MarketWindow + vol index
//!        │
//!        ▼
//!  RegimeClassifier ──► regime
//!        │
//!        ▼  (parallel, independent, side-effect free)
//!  Trend · Reversal · Volatility · Gamma · DeltaHedge · Macro
//!        │
//!        ▼
//!  InteractionRules (suppress / boost confidences)
//!        │
//!        ▼
//!  MetaRouter (regime gating + hard vetoes) ──► RoutingDecision
//! ```
//!
//! The router is caller-owned: construct one per backtest/session and pass it
//! by reference. The only mutable state is its bounded decision-history ring
//! feeding the drift monitor.

pub mod agents;
pub mod config;
pub mod drift;
pub mod indicators;
pub mod interaction;
pub mod regime;
pub mod router;

pub use agents::{MarketContext, SignalAgent, SignalSet};
pub use config::RouterConfig;
pub use drift::{DriftMonitor, DriftReport};
pub use regime::RegimeClassifier;
pub use router::MetaRouter;
