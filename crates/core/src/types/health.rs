//! Output contract of the upstream strategy health monitor.
//!
//! The control plane does not own the health scorer; it depends only on the
//! shape of its reports. The mapping from [`RecommendedAction`] to a control
//! signal lives in `tl-control::health`.

use serde::{Deserialize, Serialize};

/// Qualitative health classification of a strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unstable,
    Critical,
    /// Not enough data to classify.
    Unknown,
}

/// Action the health monitor recommends the control plane take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecommendedAction {
    /// No intervention needed.
    Allow,
    /// Reduce order size and frequency.
    Throttle,
    /// A human should look before further escalation.
    ReviewRequired,
    /// Halt execution for the strategy.
    ExecutionFreeze,
}

/// Per-dimension execution risk scores, each in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionRiskBreakdown {
    pub overall: f64,
    pub slippage: f64,
    pub liquidity: f64,
    pub partial_fill: f64,
}

/// One health report for one strategy, as emitted by the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyHealthReport {
    /// Strategy the report describes.
    pub strategy_id: String,
    /// Composite health score in `[0, 100]`; higher is healthier.
    pub health_score: f64,
    /// Qualitative classification.
    pub health_status: HealthStatus,
    /// What the monitor recommends.
    pub recommended_action: RecommendedAction,
    /// Human-readable reasons behind a degraded classification.
    pub degradation_reasons: Vec<String>,
    /// Execution risk detail.
    pub execution_risk_breakdown: ExecutionRiskBreakdown,
    /// Stability of the strategy's decision logic in `[0, 1]`.
    pub logic_stability_score: f64,
}
