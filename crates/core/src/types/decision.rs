//! Control decisions — the immutable unit of the audit log.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::{ControlSignal, ControlState, ControlTarget, Timestamp};

/// Monotonically increasing decision identifier, unique within a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DecisionId(pub u64);

impl fmt::Display for DecisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "D-{}", self.0)
    }
}

/// One state transition for one target. Immutable once written; the
/// append-only sequence of these records is the complete audit history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlDecision {
    /// Unique, monotonically increasing identifier.
    pub decision_id: DecisionId,
    /// The target this decision applies to.
    pub target: ControlTarget,
    /// State before the decision.
    pub previous_state: ControlState,
    /// State after the decision. This is the target's current state until
    /// a newer decision supersedes it.
    pub new_state: ControlState,
    /// Human-readable summary of why the transition happened.
    pub reason: String,
    /// The signals consumed to produce this decision. Empty for manual
    /// resets.
    pub signals: Vec<ControlSignal>,
    /// When the decision was made.
    pub decided_at: Timestamp,
    /// `true` when only a manual reset may lower the new state.
    pub requires_manual_reset: bool,
    /// `true` when this decision engaged the fleet-wide kill override.
    pub global_kill_override: bool,
}

impl ControlDecision {
    /// `true` if the decision raised severity.
    pub fn escalated(&self) -> bool {
        self.new_state > self.previous_state
    }
}
