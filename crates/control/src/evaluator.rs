//! Signal evaluation: `(current state, incoming signals)` → next state.
//!
//! The core rule is maximum-severity aggregation: the aggregate severity is
//! the max of all signal severities, clamped from below by the current
//! state's own severity for non-manual batches so that ordinary signals can
//! never silently heal a target. Thresholds mapping severity to state come
//! from [`ThresholdConfig`] and are policy, not hard law.
//!
//! A MANUAL signal on the GLOBAL target carrying `action = "global_kill"`
//! bypasses thresholding entirely and forces KILLED with the fleet-wide
//! override engaged — the only way to reach KILLED instantly from any
//! prior state.

use std::sync::Arc;

use tl_core::config::ThresholdConfig;
use tl_core::error::ControlError;
use tl_core::types::{ControlDecision, ControlSignal, ControlState, ControlTarget, SignalSource};

use crate::store::{ControlStore, DecisionDraft};

/// Maps incoming risk signals to control decisions and persists them.
pub struct SignalEvaluator {
    store: Arc<dyn ControlStore>,
    thresholds: ThresholdConfig,
}

impl SignalEvaluator {
    /// Create an evaluator writing through the given store.
    pub fn new(store: Arc<dyn ControlStore>, thresholds: ThresholdConfig) -> Self {
        Self { store, thresholds }
    }

    /// Evaluate a batch of signals for one target.
    ///
    /// Validates the batch, computes the next state, and commits exactly
    /// one [`ControlDecision`] — the audit record — atomically with the
    /// current-state index update. Validation failures reject before any
    /// mutation; persistence failures leave no partial state and should be
    /// retried by the producer.
    pub fn evaluate(
        &self,
        target: &ControlTarget,
        signals: &[ControlSignal],
    ) -> Result<ControlDecision, ControlError> {
        validate_signals(signals)?;

        let global_kill = target.is_global() && signals.iter().any(|s| s.is_global_kill());
        let has_manual = signals.iter().any(|s| s.source == SignalSource::Manual);
        let signal_severity = signals
            .iter()
            .map(|s| s.severity)
            .fold(0.0f64, f64::max);
        let reason = summarize(signals);

        self.store.commit(target, &mut |current| {
            let new_state = if global_kill {
                ControlState::Killed
            } else {
                let mapped = self.map_severity(f64::max(signal_severity, 0.0));
                if has_manual && !current.requires_manual_reset() {
                    // A manual signal may lower a non-severe state.
                    mapped
                } else {
                    // Non-manual signals never lower severity, and severe
                    // states never auto-heal: only the reset authority may
                    // downgrade FROZEN or KILLED.
                    mapped.max(current)
                }
            };

            if new_state > current {
                tracing::warn!(
                    target = %target,
                    from = %current,
                    to = %new_state,
                    severity = signal_severity,
                    "control state escalated"
                );
            }

            Ok(DecisionDraft {
                new_state,
                reason: reason.clone(),
                signals: signals.to_vec(),
                requires_manual_reset: new_state.requires_manual_reset(),
                global_kill_override: target.is_global() && new_state == ControlState::Killed,
            })
        })
    }

    /// Map an aggregate severity to a state via the configured thresholds.
    fn map_severity(&self, severity: f64) -> ControlState {
        let t = &self.thresholds;
        if severity >= t.killed {
            ControlState::Killed
        } else if severity >= t.frozen {
            ControlState::Frozen
        } else if severity >= t.throttled {
            ControlState::Throttled
        } else {
            ControlState::Active
        }
    }
}

/// Reject malformed batches before any state mutation.
fn validate_signals(signals: &[ControlSignal]) -> Result<(), ControlError> {
    if signals.is_empty() {
        return Err(ControlError::validation("signals must be non-empty"));
    }
    for (i, signal) in signals.iter().enumerate() {
        if !signal.severity.is_finite() || !(0.0..=1.0).contains(&signal.severity) {
            return Err(ControlError::validation(format!(
                "signal[{}] severity {} outside [0, 1]",
                i, signal.severity
            )));
        }
        if signal.reason.trim().is_empty() {
            return Err(ControlError::validation(format!(
                "signal[{}] reason must be non-empty",
                i
            )));
        }
    }
    Ok(())
}

/// Build the decision reason from the consumed signals.
fn summarize(signals: &[ControlSignal]) -> String {
    signals
        .iter()
        .map(|s| format!("{}: {}", s.source, s.reason))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tl_core::types::{SignalSource, Timestamp};

    use crate::kill_switch::GlobalKillSwitch;
    use crate::store::MemoryStore;

    fn make_evaluator() -> (Arc<MemoryStore>, SignalEvaluator) {
        let store = Arc::new(MemoryStore::new(Arc::new(GlobalKillSwitch::new())));
        let evaluator = SignalEvaluator::new(store.clone(), ThresholdConfig::default());
        (store, evaluator)
    }

    fn risk(severity: f64, reason: &str) -> ControlSignal {
        ControlSignal::new(SignalSource::Risk, severity, reason)
    }

    #[test]
    fn test_empty_signal_list_rejected() {
        let (_store, evaluator) = make_evaluator();
        let result = evaluator.evaluate(&ControlTarget::strategy("S1"), &[]);
        assert!(matches!(result, Err(ControlError::Validation { .. })));
    }

    #[test]
    fn test_out_of_range_severity_rejected_before_mutation() {
        let (store, evaluator) = make_evaluator();
        let target = ControlTarget::strategy("S1");

        for bad in [-0.1, 1.1, f64::NAN] {
            let result = evaluator.evaluate(&target, &[risk(bad, "bad")]);
            assert!(matches!(result, Err(ControlError::Validation { .. })));
        }
        assert!(store.current_state(&target).unwrap().is_none());
    }

    #[test]
    fn test_empty_reason_rejected() {
        let (_store, evaluator) = make_evaluator();
        let result =
            evaluator.evaluate(&ControlTarget::strategy("S1"), &[risk(0.5, "   ")]);
        assert!(matches!(result, Err(ControlError::Validation { .. })));
    }

    #[test]
    fn test_threshold_mapping() {
        let (_store, evaluator) = make_evaluator();
        let cases = [
            (0.0, ControlState::Active),
            (0.39, ControlState::Active),
            (0.40, ControlState::Throttled),
            (0.69, ControlState::Throttled),
            (0.70, ControlState::Frozen),
            (0.94, ControlState::Frozen),
            (0.95, ControlState::Killed),
            (1.0, ControlState::Killed),
        ];
        for (i, (severity, expected)) in cases.iter().enumerate() {
            let target = ControlTarget::strategy(format!("S{}", i));
            let decision = evaluator
                .evaluate(&target, &[risk(*severity, "threshold probe")])
                .unwrap();
            assert_eq!(decision.new_state, *expected, "severity {}", severity);
        }
    }

    #[test]
    fn test_scenario_a_drawdown_freeze() {
        let (_store, evaluator) = make_evaluator();
        let decision = evaluator
            .evaluate(
                &ControlTarget::strategy("S1"),
                &[risk(0.8, "drawdown breach")],
            )
            .unwrap();
        assert_eq!(decision.new_state, ControlState::Frozen);
        assert!(decision.requires_manual_reset);
        assert!(!decision.global_kill_override);
        assert!(decision.reason.contains("drawdown breach"));
    }

    #[test]
    fn test_scenario_b_manual_global_kill() {
        let (store, evaluator) = make_evaluator();
        let signal = ControlSignal::new(SignalSource::Manual, 1.0, "GLOBAL KILL: test")
            .with_metadata(json!({ "action": "global_kill" }));

        let decision = evaluator
            .evaluate(&ControlTarget::global(), &[signal])
            .unwrap();

        assert_eq!(decision.new_state, ControlState::Killed);
        assert!(decision.requires_manual_reset);
        assert!(decision.global_kill_override);
        assert!(store.kill_switch().is_engaged());
    }

    #[test]
    fn test_global_kill_bypasses_thresholds() {
        let (_store, evaluator) = make_evaluator();
        // Severity alone (0.2) would map to ACTIVE; the explicit intent wins.
        let signal = ControlSignal::new(SignalSource::Manual, 0.2, "GLOBAL KILL: drill")
            .with_metadata(json!({ "action": "global_kill" }));
        let decision = evaluator
            .evaluate(&ControlTarget::global(), &[signal])
            .unwrap();
        assert_eq!(decision.new_state, ControlState::Killed);
        assert!(decision.global_kill_override);
    }

    #[test]
    fn test_global_kill_metadata_on_strategy_target_is_ordinary() {
        let (store, evaluator) = make_evaluator();
        let signal = ControlSignal::new(SignalSource::Manual, 0.5, "operator throttle")
            .with_metadata(json!({ "action": "global_kill" }));
        let decision = evaluator
            .evaluate(&ControlTarget::strategy("S1"), &[signal])
            .unwrap();
        assert_eq!(decision.new_state, ControlState::Throttled);
        assert!(!decision.global_kill_override);
        assert!(!store.kill_switch().is_engaged());
    }

    #[test]
    fn test_non_manual_signals_never_lower_severity() {
        let (_store, evaluator) = make_evaluator();
        let target = ControlTarget::strategy("S1");

        evaluator.evaluate(&target, &[risk(0.8, "breach")]).unwrap();
        let decision = evaluator
            .evaluate(&target, &[risk(0.1, "all clear")])
            .unwrap();

        // Still frozen: no silent auto-heal.
        assert_eq!(decision.previous_state, ControlState::Frozen);
        assert_eq!(decision.new_state, ControlState::Frozen);
    }

    #[test]
    fn test_manual_signal_lowers_throttled() {
        let (_store, evaluator) = make_evaluator();
        let target = ControlTarget::strategy("S1");

        evaluator.evaluate(&target, &[risk(0.5, "spike")]).unwrap();
        let manual = ControlSignal::new(SignalSource::Manual, 0.1, "operator cleared");
        let decision = evaluator.evaluate(&target, &[manual]).unwrap();

        assert_eq!(decision.previous_state, ControlState::Throttled);
        assert_eq!(decision.new_state, ControlState::Active);
    }

    #[test]
    fn test_manual_signal_cannot_lower_frozen() {
        let (_store, evaluator) = make_evaluator();
        let target = ControlTarget::strategy("S1");

        evaluator.evaluate(&target, &[risk(0.8, "breach")]).unwrap();
        let manual = ControlSignal::new(SignalSource::Manual, 0.0, "operator cleared");
        let decision = evaluator.evaluate(&target, &[manual]).unwrap();

        // FROZEN may only be lowered through the reset authority.
        assert_eq!(decision.new_state, ControlState::Frozen);
    }

    #[test]
    fn test_multiple_signals_take_max_severity() {
        let (_store, evaluator) = make_evaluator();
        let signals = [
            ControlSignal::new(SignalSource::Behavior, 0.3, "minor anomaly"),
            ControlSignal::new(SignalSource::Reconciliation, 0.75, "position mismatch"),
            ControlSignal::new(SignalSource::Execution, 0.5, "slippage"),
        ];
        let decision = evaluator
            .evaluate(&ControlTarget::strategy("S1"), &signals)
            .unwrap();
        assert_eq!(decision.new_state, ControlState::Frozen);
        assert_eq!(decision.signals.len(), 3);
        assert!(decision.reason.contains("RECONCILIATION"));
    }

    #[test]
    fn test_each_evaluate_appends_exactly_one_decision() {
        let (store, evaluator) = make_evaluator();
        let target = ControlTarget::strategy("S1");
        for i in 0..4 {
            evaluator
                .evaluate(&target, &[risk(0.1 * i as f64, "probe")])
                .unwrap();
        }
        let log = store
            .audit(&crate::store::AuditQuery { limit: 100, ..Default::default() })
            .unwrap();
        assert_eq!(log.len(), 4);
    }

    #[test]
    fn test_custom_thresholds() {
        let store = Arc::new(MemoryStore::new(Arc::new(GlobalKillSwitch::new())));
        let thresholds = ThresholdConfig {
            throttled: 0.2,
            frozen: 0.5,
            killed: 0.8,
        };
        let evaluator = SignalEvaluator::new(store, thresholds);
        let decision = evaluator
            .evaluate(&ControlTarget::strategy("S1"), &[risk(0.6, "probe")])
            .unwrap();
        assert_eq!(decision.new_state, ControlState::Frozen);
    }

    #[test]
    fn test_scenario_d_concurrent_out_of_order_severities() {
        use std::thread;

        let (store, _) = make_evaluator();
        let target = ControlTarget::strategy("S1");

        let mut handles = Vec::new();
        for severity in [0.5, 0.9] {
            let store = store.clone();
            let target = target.clone();
            handles.push(thread::spawn(move || {
                let evaluator =
                    SignalEvaluator::new(store as Arc<dyn ControlStore>, ThresholdConfig::default());
                evaluator
                    .evaluate(&target, &[ControlSignal {
                        source: SignalSource::Risk,
                        severity,
                        reason: format!("severity {}", severity),
                        timestamp: Timestamp::now(),
                        metadata: None,
                    }])
                    .unwrap();
            }));
        }
        for h in handles {
            h.join().unwrap();
        }

        // Whichever order the writes land in, 0.9 governs the final state.
        assert_eq!(
            store.current_state(&target).unwrap(),
            Some(ControlState::Frozen)
        );
    }
}
