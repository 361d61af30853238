//! Strategy-health report → control signal mapping.
//!
//! The health monitor is an upstream heuristic subsystem; the control plane
//! depends only on its output contract. This module fixes the mapping from
//! [`RecommendedAction`] to signal severity so that health degradation
//! escalates control state consistently: with default thresholds,
//! `ExecutionFreeze` lands in FROZEN, `ReviewRequired` and `Throttle` in
//! THROTTLED, and `Allow` cannot escalate anything.

use tl_core::types::{ControlSignal, RecommendedAction, SignalSource, StrategyHealthReport};

/// Severity emitted for `ExecutionFreeze` (maps to FROZEN by default).
pub const SEVERITY_EXECUTION_FREEZE: f64 = 0.8;
/// Severity emitted for `ReviewRequired`.
pub const SEVERITY_REVIEW_REQUIRED: f64 = 0.6;
/// Severity emitted for `Throttle`.
pub const SEVERITY_THROTTLE: f64 = 0.5;
/// Severity emitted for `Allow` — a no-op signal producers may skip.
pub const SEVERITY_ALLOW: f64 = 0.0;

/// Severity for a recommended action.
pub fn severity_for_action(action: RecommendedAction) -> f64 {
    match action {
        RecommendedAction::Allow => SEVERITY_ALLOW,
        RecommendedAction::Throttle => SEVERITY_THROTTLE,
        RecommendedAction::ReviewRequired => SEVERITY_REVIEW_REQUIRED,
        RecommendedAction::ExecutionFreeze => SEVERITY_EXECUTION_FREEZE,
    }
}

/// Build the control signal for a health report.
///
/// The signal targets the report's strategy; callers pass it to
/// [`SignalEvaluator::evaluate`](crate::SignalEvaluator::evaluate) with
/// `ControlTarget::strategy(&report.strategy_id)`.
pub fn signal_for_report(report: &StrategyHealthReport) -> ControlSignal {
    let reason = if report.degradation_reasons.is_empty() {
        format!(
            "health {:?} (score {:.1}), action {:?}",
            report.health_status, report.health_score, report.recommended_action
        )
    } else {
        format!(
            "health {:?} (score {:.1}): {}",
            report.health_status,
            report.health_score,
            report.degradation_reasons.join(", ")
        )
    };

    ControlSignal::new(
        SignalSource::StrategyHealth,
        severity_for_action(report.recommended_action),
        reason,
    )
    .with_metadata(serde_json::json!({
        "health_score": report.health_score,
        "health_status": report.health_status,
        "recommended_action": report.recommended_action,
        "execution_risk_overall": report.execution_risk_breakdown.overall,
        "logic_stability_score": report.logic_stability_score,
    }))
}
