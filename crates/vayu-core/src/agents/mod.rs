//! # Specialized Signal Agents
//!
//! Six independent generators share one contract: read the market window and
//! context, return an [`AgentSignal`]. Each call is a pure function of its
//! inputs - no agent keeps state between bars, so evaluations can run in any
//! order (or in parallel) without changing results.
//!
//! Every agent degrades to a confidence-0 HOLD below
//! [`MarketWindow::MIN_BARS`] bars of history; the caller never handles an
//! error for a well-formed invocation.

mod gamma;
mod hedge;
mod macro_agent;
mod reversal;
mod trend;
mod volatility;

pub use gamma::GammaModelAgent;
pub use hedge::DeltaHedgingAgent;
pub use macro_agent::MacroAgent;
pub use reversal::ReversalAgent;
pub use trend::TrendAgent;
pub use volatility::VolatilityBreakoutAgent;

use vayu_models::{AgentKind, AgentSignal, AgentVerdict, MarketWindow};

/// Time to expiry used for ATM Greeks: one trading hour, in years.
pub const ZERO_DTE_YEARS: f64 = 1.0 / (252.0 * 6.5);

/// Already-resolved inputs the agents need beyond the bar window.
///
/// Built fresh by the caller per evaluation; replaces any notion of shared
/// global state so parallel backtests can run side by side.
#[derive(Debug, Clone)]
pub struct MarketContext {
    /// External volatility index reading (VIX-style, index points).
    pub vol_index: f64,
    /// Underlying price override; defaults to the latest close.
    pub spot: Option<f64>,
    /// Strike override; defaults to the nearest round strike (ATM).
    pub strike: Option<f64>,
    /// Net portfolio delta from the portfolio Greeks snapshot.
    pub portfolio_delta: f64,
    /// Maximum allowed absolute portfolio delta.
    pub delta_limit: f64,
    /// Risk-free rate for the Greeks primitives.
    pub risk_free_rate: f64,
}

impl MarketContext {
    pub fn new(vol_index: f64) -> Self {
        Self {
            vol_index,
            spot: None,
            strike: None,
            portfolio_delta: 0.0,
            delta_limit: 2000.0,
            risk_free_rate: 0.04,
        }
    }

    pub fn with_portfolio_delta(mut self, delta: f64, limit: f64) -> Self {
        self.portfolio_delta = delta;
        self.delta_limit = limit;
        self
    }

    pub fn with_contract(mut self, spot: f64, strike: f64) -> Self {
        self.spot = Some(spot);
        self.strike = Some(strike);
        self
    }

    /// Spot price: override, else latest close, else None.
    pub fn spot_price(&self, window: &MarketWindow) -> Option<f64> {
        self.spot.or_else(|| window.latest().map(|b| b.close))
    }

    /// Strike: override, else nearest round strike to spot.
    pub fn strike_price(&self, window: &MarketWindow) -> Option<f64> {
        self.strike.or_else(|| self.spot_price(window).map(|s| s.round()))
    }

    /// Implied-volatility estimate scaled from the vol index, floored at 20%.
    pub fn implied_vol(&self) -> f64 {
        if self.vol_index > 0.0 {
            self.vol_index / 100.0 * 1.3
        } else {
            0.20
        }
    }
}

/// Common contract for the six agents.
pub trait SignalAgent {
    fn kind(&self) -> AgentKind;

    /// Produces a fresh opinion for the current bar. Must return a
    /// confidence-0 HOLD when `window` holds fewer than 20 bars.
    fn analyze(&self, window: &MarketWindow, ctx: &MarketContext) -> AgentSignal;
}

/// One field per agent - the closed-set replacement for a name-keyed map.
/// The interaction layer mutates these in place; the router reads them.
#[derive(Debug, Clone)]
pub struct SignalSet {
    pub trend: AgentSignal,
    pub reversal: AgentSignal,
    pub volatility: AgentSignal,
    pub gamma: AgentSignal,
    pub hedge: AgentSignal,
    pub macro_signal: AgentSignal,
}

impl SignalSet {
    pub fn get(&self, kind: AgentKind) -> &AgentSignal {
        match kind {
            AgentKind::Trend => &self.trend,
            AgentKind::Reversal => &self.reversal,
            AgentKind::Volatility => &self.volatility,
            AgentKind::GammaModel => &self.gamma,
            AgentKind::DeltaHedging => &self.hedge,
            AgentKind::Macro => &self.macro_signal,
        }
    }

    pub fn iter(&self) -> [&AgentSignal; 6] {
        [&self.trend, &self.reversal, &self.volatility, &self.gamma, &self.hedge, &self.macro_signal]
    }

    /// Flattens into audit line items, marking which agents the gate selected.
    pub fn to_verdicts(&self, selected: impl Fn(AgentKind) -> bool) -> Vec<AgentVerdict> {
        self.iter()
            .into_iter()
            .map(|s| AgentVerdict {
                agent: s.agent,
                action: s.action,
                confidence: s.confidence,
                strength: s.strength,
                rationale: s.rationale.clone(),
                selected: selected(s.agent),
            })
            .collect()
    }
}

/// The full agent bench, constructed once per router.
pub struct AgentBench {
    pub trend: TrendAgent,
    pub reversal: ReversalAgent,
    pub volatility: VolatilityBreakoutAgent,
    pub gamma: GammaModelAgent,
    pub hedge: DeltaHedgingAgent,
    pub macro_agent: MacroAgent,
}

impl Default for AgentBench {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBench {
    pub fn new() -> Self {
        Self {
            trend: TrendAgent::new(),
            reversal: ReversalAgent::new(),
            volatility: VolatilityBreakoutAgent::new(),
            gamma: GammaModelAgent::new(),
            hedge: DeltaHedgingAgent::new(),
            macro_agent: MacroAgent::new(),
        }
    }

    /// Runs all six agents over the same inputs. Evaluations are independent
    /// and side-effect free; sequential order is irrelevant.
    pub fn analyze_all(&self, window: &MarketWindow, ctx: &MarketContext) -> SignalSet {
        SignalSet {
            trend: self.trend.analyze(window, ctx),
            reversal: self.reversal.analyze(window, ctx),
            volatility: self.volatility.analyze(window, ctx),
            gamma: self.gamma.analyze(window, ctx),
            hedge: self.hedge.analyze(window, ctx),
            macro_signal: self.macro_agent.analyze(window, ctx),
        }
    }
}
