//! Derived fleet status for operational dashboards.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::Timestamp;

/// Aggregate view over the current-state index. Never authoritative —
/// always recomputable from per-target current states plus the kill
/// override flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlStatus {
    /// True iff the GLOBAL target is KILLED or the fleet-wide override
    /// flag is engaged. The two are kept in lock-step by the store.
    pub global_killed: bool,
    /// Number of targets with at least one decision.
    pub total_targets: usize,
    /// Target counts keyed by state name (`"ACTIVE"`, `"THROTTLED"`, ...).
    pub by_state: BTreeMap<String, usize>,
    /// Target counts keyed by scope name (`"STRATEGY"`, `"USER"`, ...).
    pub by_scope: BTreeMap<String, usize>,
    /// When this snapshot was computed.
    pub last_updated: Timestamp,
}
