//! Derived fleet status for dashboards.
//!
//! Scans the current-state index (never the audit log), so the cost is
//! O(number of targets) regardless of decision history length.

use std::collections::BTreeMap;
use std::sync::Arc;

use tl_core::error::ControlError;
use tl_core::types::{ControlState, ControlStatus, Timestamp};

use crate::kill_switch::GlobalKillSwitch;
use crate::store::ControlStore;

/// Computes [`ControlStatus`] snapshots.
pub struct StatusAggregator {
    store: Arc<dyn ControlStore>,
    kill_switch: Arc<GlobalKillSwitch>,
}

impl StatusAggregator {
    /// Create an aggregator over the given store and kill switch.
    pub fn new(store: Arc<dyn ControlStore>, kill_switch: Arc<GlobalKillSwitch>) -> Self {
        Self { store, kill_switch }
    }

    /// Compute a fleet status snapshot.
    ///
    /// `global_killed` is true iff the GLOBAL target's current state is
    /// KILLED or the override flag is engaged. The store keeps those two in
    /// lock-step, so either alone would do; checking both means a reader
    /// can never observe them as inconsistent.
    pub fn status(&self) -> Result<ControlStatus, ControlError> {
        let snapshot = self.store.snapshot()?;

        let mut by_state: BTreeMap<String, usize> = BTreeMap::new();
        let mut by_scope: BTreeMap<String, usize> = BTreeMap::new();
        let mut global_state_killed = false;

        for (target, state) in &snapshot {
            *by_state.entry(state.to_string()).or_insert(0) += 1;
            *by_scope.entry(target.scope.to_string()).or_insert(0) += 1;
            if target.is_global() && *state == ControlState::Killed {
                global_state_killed = true;
            }
        }

        Ok(ControlStatus {
            global_killed: global_state_killed || self.kill_switch.is_engaged(),
            total_targets: snapshot.len(),
            by_state,
            by_scope,
            last_updated: Timestamp::now(),
        })
    }
}
