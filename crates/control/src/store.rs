//! Durable per-target state index and append-only decision log.
//!
//! [`ControlStore`] is the seam between decision logic and persistence.
//! [`MemoryStore`] is the production implementation: an in-memory
//! current-state index guarded by a `parking_lot::RwLock`, an append-only
//! in-memory decision log, and an optional [`DecisionJournal`] for
//! durability across restarts.
//!
//! ## Commit protocol
//!
//! All writes go through [`ControlStore::commit`], which runs the caller's
//! decision function and persists the result under a single commit lock.
//! That serializes read-modify-write cycles, so two concurrent evaluations
//! of the same target can never interleave — the later one always sees the
//! earlier one's state. The journal append happens before the index update;
//! if it fails, the index and log are untouched and the caller sees a
//! `Persistence` error with zero partial effect.
//!
//! Gate reads take only the index read lock, never the commit lock, so a
//! slow journal write cannot stall the order path.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use tl_core::error::ControlError;
use tl_core::types::{
    ControlDecision, ControlSignal, ControlState, ControlTarget, DecisionId, Timestamp,
};

use crate::journal::DecisionJournal;
use crate::kill_switch::GlobalKillSwitch;

/// A transition computed by the evaluator or reset authority, not yet
/// committed. The store assigns the decision id and timestamp.
#[derive(Debug, Clone)]
pub struct DecisionDraft {
    /// State the target moves to.
    pub new_state: ControlState,
    /// Audit reason.
    pub reason: String,
    /// Signals consumed to produce the transition.
    pub signals: Vec<ControlSignal>,
    /// Whether only a manual reset may lower the new state.
    pub requires_manual_reset: bool,
    /// Whether this decision engages the fleet-wide kill override.
    pub global_kill_override: bool,
}

/// Bounded audit-log query.
#[derive(Debug, Clone)]
pub struct AuditQuery {
    /// Restrict to one target.
    pub target: Option<ControlTarget>,
    /// Inclusive lower bound on `decided_at`.
    pub start: Option<Timestamp>,
    /// Inclusive upper bound on `decided_at`.
    pub end: Option<Timestamp>,
    /// Maximum number of records returned, in ascending decision-id order.
    pub limit: usize,
}

impl Default for AuditQuery {
    /// Unfiltered query with the standard record limit. A zero limit would
    /// silently return nothing, so the default matches the config default.
    fn default() -> Self {
        Self {
            target: None,
            start: None,
            end: None,
            limit: tl_core::config::DEFAULT_AUDIT_LIMIT,
        }
    }
}

/// Persistence seam for the control plane.
///
/// Implementations must guarantee that `commit` serializes writes per
/// target and that a failed commit leaves no partial state visible.
pub trait ControlStore: Send + Sync {
    /// Current state of a target. `Ok(None)` if the target has no record
    /// yet (it is implicitly ACTIVE but untracked).
    fn current_state(&self, target: &ControlTarget) -> Result<Option<ControlState>, ControlError>;

    /// Atomically compute and persist one decision for `target`.
    ///
    /// `decide` receives the target's current state (ACTIVE for a target
    /// with no record — lazy creation) and returns the draft transition.
    /// Validation errors returned by `decide` abort the commit with no
    /// mutation. On success, exactly one decision has been appended to the
    /// log (and journal, if configured) and the index reflects its
    /// `new_state`.
    fn commit(
        &self,
        target: &ControlTarget,
        decide: &mut dyn FnMut(ControlState) -> Result<DecisionDraft, ControlError>,
    ) -> Result<ControlDecision, ControlError>;

    /// Snapshot of all tracked `(target, state)` pairs, for aggregation.
    fn snapshot(&self) -> Result<Vec<(ControlTarget, ControlState)>, ControlError>;

    /// Query the audit log. Results are in ascending decision-id order so
    /// repeated queries observe a stable prefix plus newly appended records.
    fn audit(&self, query: &AuditQuery) -> Result<Vec<ControlDecision>, ControlError>;
}

/// In-memory store with optional journal durability.
pub struct MemoryStore {
    /// Current-state index: one entry per target, O(1) lookup.
    index: RwLock<HashMap<ControlTarget, ControlState>>,
    /// Append-only decision log.
    log: RwLock<Vec<ControlDecision>>,
    /// Optional durable journal, written before the index on each commit.
    journal: Mutex<Option<DecisionJournal>>,
    /// Next decision id. Only advanced under the commit lock, so log order
    /// matches id order.
    next_id: AtomicU64,
    /// Serializes all read-modify-write cycles.
    commit_lock: Mutex<()>,
    /// Fleet-wide kill override, kept in lock-step with GLOBAL decisions.
    kill_switch: Arc<GlobalKillSwitch>,
}

impl MemoryStore {
    /// Create a store with no journal (audit trail in memory only).
    pub fn new(kill_switch: Arc<GlobalKillSwitch>) -> Self {
        Self {
            index: RwLock::new(HashMap::new()),
            log: RwLock::new(Vec::new()),
            journal: Mutex::new(None),
            next_id: AtomicU64::new(1),
            commit_lock: Mutex::new(()),
            kill_switch,
        }
    }

    /// Create a store backed by a journal, replaying any existing records
    /// to rebuild the index, log, id counter, and kill override.
    pub fn with_journal(
        kill_switch: Arc<GlobalKillSwitch>,
        journal: DecisionJournal,
    ) -> Result<Self, ControlError> {
        let store = Self::new(kill_switch);

        let replayed = journal
            .replay()
            .map_err(|e| ControlError::persistence(format!("journal replay failed: {e:#}")))?;

        if !replayed.is_empty() {
            let mut index = store.index.write();
            let mut max_id = 0u64;
            for decision in &replayed {
                index.insert(decision.target.clone(), decision.new_state);
                max_id = max_id.max(decision.decision_id.0);
            }
            drop(index);

            // The override flag follows the latest GLOBAL decision.
            if let Some(last_global) = replayed.iter().rev().find(|d| d.target.is_global()) {
                if last_global.global_kill_override {
                    store.kill_switch.engage(last_global.reason.clone());
                }
            }

            store.next_id.store(max_id + 1, Ordering::SeqCst);
            let count = replayed.len();
            *store.log.write() = replayed;
            tracing::info!(decisions = count, "restored control state from journal");
        }

        *store.journal.lock() = Some(journal);
        Ok(store)
    }

    /// The kill switch this store keeps in lock-step with GLOBAL decisions.
    pub fn kill_switch(&self) -> Arc<GlobalKillSwitch> {
        self.kill_switch.clone()
    }

    /// Rotate the backing journal, if one is configured. Takes the commit
    /// lock so no decision is appended mid-rotation. Returns the path of
    /// the archived file, or `None` when the store has no journal.
    pub fn rotate_journal(&self) -> Result<Option<std::path::PathBuf>, ControlError> {
        let _guard = self.commit_lock.lock();
        match self.journal.lock().as_mut() {
            Some(journal) => journal
                .rotate()
                .map(Some)
                .map_err(|e| ControlError::persistence(format!("journal rotation failed: {e:#}"))),
            None => Ok(None),
        }
    }
}

impl ControlStore for MemoryStore {
    fn current_state(&self, target: &ControlTarget) -> Result<Option<ControlState>, ControlError> {
        Ok(self.index.read().get(target).copied())
    }

    fn commit(
        &self,
        target: &ControlTarget,
        decide: &mut dyn FnMut(ControlState) -> Result<DecisionDraft, ControlError>,
    ) -> Result<ControlDecision, ControlError> {
        let _guard = self.commit_lock.lock();

        // Lazy record creation: an unseen target is ACTIVE.
        let previous_state = self
            .index
            .read()
            .get(target)
            .copied()
            .unwrap_or(ControlState::Active);

        let draft = decide(previous_state)?;

        let decision = ControlDecision {
            decision_id: DecisionId(self.next_id.load(Ordering::SeqCst)),
            target: target.clone(),
            previous_state,
            new_state: draft.new_state,
            reason: draft.reason,
            signals: draft.signals,
            decided_at: Timestamp::now(),
            requires_manual_reset: draft.requires_manual_reset,
            global_kill_override: draft.global_kill_override,
        };

        // Journal first. A failed append aborts with the id unconsumed and
        // the index untouched, so no partial state is ever visible.
        if let Some(journal) = self.journal.lock().as_mut() {
            journal
                .append(&decision)
                .map_err(|e| ControlError::persistence(format!("journal append failed: {e:#}")))?;
        }

        self.next_id.fetch_add(1, Ordering::SeqCst);
        self.index
            .write()
            .insert(target.clone(), decision.new_state);
        self.log.write().push(decision.clone());

        // Keep the override flag in lock-step with GLOBAL decisions.
        if target.is_global() {
            if decision.new_state == ControlState::Killed {
                self.kill_switch.engage(decision.reason.clone());
            } else if decision.new_state == ControlState::Active {
                self.kill_switch.disengage();
            }
        }

        tracing::info!(
            decision_id = decision.decision_id.0,
            target = %decision.target,
            previous = %decision.previous_state,
            new = %decision.new_state,
            reason = %decision.reason,
            "control decision committed"
        );

        Ok(decision)
    }

    fn snapshot(&self) -> Result<Vec<(ControlTarget, ControlState)>, ControlError> {
        Ok(self
            .index
            .read()
            .iter()
            .map(|(t, s)| (t.clone(), *s))
            .collect())
    }

    fn audit(&self, query: &AuditQuery) -> Result<Vec<ControlDecision>, ControlError> {
        let log = self.log.read();
        let results = log
            .iter()
            .filter(|d| query.target.as_ref().map_or(true, |t| &d.target == t))
            .filter(|d| query.start.map_or(true, |s| d.decided_at >= s))
            .filter(|d| query.end.map_or(true, |e| d.decided_at <= e))
            .take(query.limit)
            .cloned()
            .collect();
        Ok(results)
    }
}
