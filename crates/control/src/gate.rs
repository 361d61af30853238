//! Execution gate — the hot-path `can_execute` check.
//!
//! Consulted by the order pipeline before every live or paper submission.
//! Reads only materialized state: the kill override (one atomic load) and
//! the current-state index (one O(1) lookup per scope). It never invokes
//! the signal evaluator and never waits on an audit write.
//!
//! The gate is **fail-closed**: any inability to determine current state
//! for a required scope, including a persistence error, denies execution.

use std::sync::Arc;

use serde::Serialize;

use tl_core::types::{ControlState, ControlTarget};

use crate::kill_switch::GlobalKillSwitch;
use crate::store::ControlStore;

/// Outcome of a gate check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GateVerdict {
    /// Whether the order may be submitted.
    pub can_execute: bool,
    /// Denial cause, or a throttle advisory when execution is allowed but
    /// the caller should reduce size and frequency. `None` means fully
    /// active.
    pub reason: Option<String>,
}

impl GateVerdict {
    fn allow() -> Self {
        Self {
            can_execute: true,
            reason: None,
        }
    }

    fn allow_throttled(reason: String) -> Self {
        Self {
            can_execute: true,
            reason: Some(reason),
        }
    }

    fn deny(reason: String) -> Self {
        Self {
            can_execute: false,
            reason: Some(reason),
        }
    }
}

/// Read-only execution gate over the current-state index.
pub struct ExecutionGate {
    store: Arc<dyn ControlStore>,
    kill_switch: Arc<GlobalKillSwitch>,
}

impl ExecutionGate {
    /// Create a gate reading from the given store and kill switch.
    pub fn new(store: Arc<dyn ControlStore>, kill_switch: Arc<GlobalKillSwitch>) -> Self {
        Self { store, kill_switch }
    }

    /// Decide whether an order for `strategy_id` on behalf of `user_id`
    /// (optionally through `broker_id`) may be submitted.
    ///
    /// Check order: fleet-wide kill override, then STRATEGY, USER, and
    /// BROKER target states. The most severe applicable state governs:
    /// FROZEN or KILLED on any checked target denies; THROTTLED allows
    /// with an advisory; ACTIVE (or no record) allows silently.
    pub fn can_execute(
        &self,
        strategy_id: &str,
        user_id: &str,
        broker_id: Option<&str>,
    ) -> GateVerdict {
        // The override always wins, even when every individual target
        // still shows ACTIVE. Checked independently of the index so it can
        // never be masked by stale per-target reads.
        if self.kill_switch.is_engaged() {
            let detail = self
                .kill_switch
                .reason()
                .map(|r| format!("global kill active: {}", r))
                .unwrap_or_else(|| "global kill active".to_string());
            return GateVerdict::deny(detail);
        }

        let mut targets = vec![
            ControlTarget::strategy(strategy_id),
            ControlTarget::user(user_id),
        ];
        if let Some(broker) = broker_id {
            targets.push(ControlTarget::broker(broker));
        }

        let mut throttles: Vec<String> = Vec::new();
        for target in &targets {
            match self.store.current_state(target) {
                Ok(None) | Ok(Some(ControlState::Active)) => {}
                Ok(Some(ControlState::Throttled)) => {
                    throttles.push(format!("{} throttled", target));
                }
                Ok(Some(state @ (ControlState::Frozen | ControlState::Killed))) => {
                    return GateVerdict::deny(format!("{} is {}", target, state));
                }
                Err(e) => {
                    // Fail closed: unknown state is treated as unsafe.
                    tracing::error!(target = %target, error = %e, "gate state read failed — denying");
                    return GateVerdict::deny(format!(
                        "cannot determine state for {}: {}",
                        target, e
                    ));
                }
            }
        }

        if throttles.is_empty() {
            GateVerdict::allow()
        } else {
            GateVerdict::allow_throttled(throttles.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tl_core::error::ControlError;
    use tl_core::types::{ControlDecision, ControlSignal, SignalSource};

    use crate::store::{AuditQuery, DecisionDraft, MemoryStore};

    fn setup() -> (Arc<MemoryStore>, ExecutionGate) {
        let ks = Arc::new(GlobalKillSwitch::new());
        let store = Arc::new(MemoryStore::new(ks.clone()));
        let gate = ExecutionGate::new(store.clone(), ks);
        (store, gate)
    }

    fn set_state(store: &MemoryStore, target: &ControlTarget, state: ControlState) {
        store
            .commit(target, &mut |_| {
                Ok(DecisionDraft {
                    new_state: state,
                    reason: "test setup".to_string(),
                    signals: vec![ControlSignal::new(SignalSource::Risk, 0.5, "setup")],
                    requires_manual_reset: state.requires_manual_reset(),
                    global_kill_override: target.is_global() && state == ControlState::Killed,
                })
            })
            .unwrap();
    }

    #[test]
    fn test_unknown_targets_allow() {
        let (_store, gate) = setup();
        let verdict = gate.can_execute("S1", "U1", None);
        assert!(verdict.can_execute);
        assert!(verdict.reason.is_none());
    }

    #[test]
    fn test_frozen_strategy_denies() {
        let (store, gate) = setup();
        set_state(&store, &ControlTarget::strategy("S1"), ControlState::Frozen);

        let verdict = gate.can_execute("S1", "U1", None);
        assert!(!verdict.can_execute);
        assert!(verdict.reason.unwrap().contains("STRATEGY:S1"));
    }

    #[test]
    fn test_killed_user_denies() {
        let (store, gate) = setup();
        set_state(&store, &ControlTarget::user("U1"), ControlState::Killed);

        let verdict = gate.can_execute("S1", "U1", None);
        assert!(!verdict.can_execute);
    }

    #[test]
    fn test_frozen_broker_denies_only_when_supplied() {
        let (store, gate) = setup();
        set_state(&store, &ControlTarget::broker("B1"), ControlState::Frozen);

        assert!(gate.can_execute("S1", "U1", None).can_execute);
        assert!(!gate.can_execute("S1", "U1", Some("B1")).can_execute);
        assert!(gate.can_execute("S1", "U1", Some("B2")).can_execute);
    }

    #[test]
    fn test_throttled_allows_with_advisory() {
        let (store, gate) = setup();
        set_state(&store, &ControlTarget::strategy("S1"), ControlState::Throttled);

        let verdict = gate.can_execute("S1", "U1", None);
        assert!(verdict.can_execute);
        assert!(verdict.reason.unwrap().contains("throttled"));
    }

    #[test]
    fn test_multiple_throttles_all_reported() {
        let (store, gate) = setup();
        set_state(&store, &ControlTarget::strategy("S1"), ControlState::Throttled);
        set_state(&store, &ControlTarget::user("U1"), ControlState::Throttled);

        let verdict = gate.can_execute("S1", "U1", None);
        assert!(verdict.can_execute);
        let reason = verdict.reason.unwrap();
        assert!(reason.contains("STRATEGY:S1"));
        assert!(reason.contains("USER:U1"));
    }

    #[test]
    fn test_global_override_denies_everything() {
        let (store, gate) = setup();
        set_state(&store, &ControlTarget::global(), ControlState::Killed);

        // Targets with no record — their own state would allow.
        let verdict = gate.can_execute("S_fresh", "U_fresh", Some("B_fresh"));
        assert!(!verdict.can_execute);
        assert!(verdict.reason.unwrap().contains("global kill active"));
    }

    #[test]
    fn test_override_wins_over_active_records() {
        let (store, gate) = setup();
        set_state(&store, &ControlTarget::strategy("S1"), ControlState::Active);
        set_state(&store, &ControlTarget::user("U1"), ControlState::Active);
        set_state(&store, &ControlTarget::global(), ControlState::Killed);

        assert!(!gate.can_execute("S1", "U1", None).can_execute);
    }

    /// Store double whose reads always fail, to exercise fail-closed.
    struct FailingStore;

    impl ControlStore for FailingStore {
        fn current_state(
            &self,
            _target: &ControlTarget,
        ) -> Result<Option<ControlState>, ControlError> {
            Err(ControlError::persistence("store unreachable"))
        }

        fn commit(
            &self,
            _target: &ControlTarget,
            _decide: &mut dyn FnMut(ControlState) -> Result<DecisionDraft, ControlError>,
        ) -> Result<ControlDecision, ControlError> {
            Err(ControlError::persistence("store unreachable"))
        }

        fn snapshot(&self) -> Result<Vec<(ControlTarget, ControlState)>, ControlError> {
            Err(ControlError::persistence("store unreachable"))
        }

        fn audit(&self, _query: &AuditQuery) -> Result<Vec<ControlDecision>, ControlError> {
            Err(ControlError::persistence("store unreachable"))
        }
    }

    #[test]
    fn test_fail_closed_on_persistence_error() {
        let gate = ExecutionGate::new(Arc::new(FailingStore), Arc::new(GlobalKillSwitch::new()));
        let verdict = gate.can_execute("S1", "U1", None);
        assert!(!verdict.can_execute);
        assert!(verdict.reason.unwrap().contains("cannot determine state"));
    }

    #[test]
    fn test_scenario_a_freeze_then_gate_denies() {
        let ks = Arc::new(GlobalKillSwitch::new());
        let store = Arc::new(MemoryStore::new(ks.clone()));
        let evaluator = crate::evaluator::SignalEvaluator::new(
            store.clone(),
            tl_core::config::ThresholdConfig::default(),
        );
        let gate = ExecutionGate::new(store, ks);

        evaluator
            .evaluate(
                &ControlTarget::strategy("S1"),
                &[ControlSignal::new(SignalSource::Risk, 0.8, "drawdown breach")],
            )
            .unwrap();

        assert!(!gate.can_execute("S1", "U1", None).can_execute);
        assert!(gate.can_execute("S2", "U1", None).can_execute);
    }
}
