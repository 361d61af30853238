//! Fleet-wide kill override.
//!
//! The [`GlobalKillSwitch`] uses an [`AtomicBool`] for the engaged flag so
//! that the hot-path check (`is_engaged`) is lock-free. The reason and
//! engage timestamp are behind a `parking_lot::Mutex` since they are only
//! written during exceptional events.
//!
//! This is the single highest-consequence piece of shared mutable state in
//! the control plane. It is deliberately kept out of the per-target index:
//! when engaged, the execution gate denies every target regardless of that
//! target's own state, and the flag can only be cleared by a manual reset
//! on the GLOBAL target.

use std::sync::atomic::{AtomicBool, Ordering};

use tl_core::types::Timestamp;

/// Snapshot of the kill switch, returned by [`GlobalKillSwitch::status`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct KillSwitchStatus {
    /// Whether the fleet-wide override is engaged.
    pub engaged: bool,
    /// The reason the override was engaged, if any.
    pub reason: Option<String>,
    /// When the override was engaged, if it is.
    pub engaged_at: Option<Timestamp>,
}

/// Lock-free fleet-wide kill override.
///
/// Checked first on every gate evaluation. `is_engaged` is a single atomic
/// load, so a slow audit write can never delay the order path's view of a
/// kill, and a kill is observed by all callers as soon as the store commits
/// it.
pub struct GlobalKillSwitch {
    engaged: AtomicBool,
    reason: parking_lot::Mutex<Option<String>>,
    engaged_at: parking_lot::Mutex<Option<Timestamp>>,
}

impl GlobalKillSwitch {
    /// Create a disengaged kill switch.
    pub fn new() -> Self {
        Self {
            engaged: AtomicBool::new(false),
            reason: parking_lot::Mutex::new(None),
            engaged_at: parking_lot::Mutex::new(None),
        }
    }

    /// Returns `true` if the fleet-wide override is engaged.
    ///
    /// Single atomic load; safe to call on the hot path.
    #[inline]
    pub fn is_engaged(&self) -> bool {
        self.engaged.load(Ordering::Relaxed)
    }

    /// Engage the override, denying execution for every target.
    pub fn engage(&self, reason: String) {
        self.engaged.store(true, Ordering::SeqCst);
        tracing::error!(reason = %reason, "GLOBAL KILL ENGAGED — all execution denied");
        *self.reason.lock() = Some(reason);
        *self.engaged_at.lock() = Some(Timestamp::now());
    }

    /// Disengage the override. Only the manual reset path on the GLOBAL
    /// target calls this.
    pub fn disengage(&self) {
        self.engaged.store(false, Ordering::SeqCst);
        tracing::warn!("global kill disengaged — per-target states govern again");
        *self.reason.lock() = None;
        *self.engaged_at.lock() = None;
    }

    /// The reason the override was engaged, if it is.
    pub fn reason(&self) -> Option<String> {
        self.reason.lock().clone()
    }

    /// Return the current kill switch status.
    pub fn status(&self) -> KillSwitchStatus {
        KillSwitchStatus {
            engaged: self.is_engaged(),
            reason: self.reason.lock().clone(),
            engaged_at: *self.engaged_at.lock(),
        }
    }
}

impl Default for GlobalKillSwitch {
    fn default() -> Self {
        Self::new()
    }
}
