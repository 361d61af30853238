//! Manual reset authority.
//!
//! The only path that may downgrade FROZEN or KILLED back to ACTIVE. The
//! evaluator never auto-heals a severe state, so a real incident stays
//! latched until a verified human clears it — and that clearance is itself
//! an audit record carrying the admin identity and reason.

use std::sync::Arc;

use serde_json::json;

use tl_core::error::ControlError;
use tl_core::types::{ControlDecision, ControlSignal, ControlState, ControlTarget, SignalSource};

use crate::store::{ControlStore, DecisionDraft};

/// External authorization collaborator. The control plane does not manage
/// principals; it only asks whether one holds elevated privilege.
pub trait AdminVerifier: Send + Sync {
    /// `true` when `admin_id` presenting `credential` holds elevated
    /// privilege.
    fn is_elevated(&self, admin_id: &str, credential: &str) -> bool;
}

/// Token-backed verifier: a single shared operator token, taken from the
/// environment at startup. `None` disables manual reset entirely.
pub struct TokenVerifier {
    token: Option<String>,
}

impl TokenVerifier {
    /// Create a verifier around an optional operator token.
    pub fn new(token: Option<String>) -> Self {
        Self { token }
    }

    /// `true` when reset is possible at all.
    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }
}

impl AdminVerifier for TokenVerifier {
    fn is_elevated(&self, _admin_id: &str, credential: &str) -> bool {
        match &self.token {
            Some(token) => credential == token,
            None => false,
        }
    }
}

/// Applies verified manual resets through the store.
pub struct ResetAuthority {
    store: Arc<dyn ControlStore>,
    verifier: Arc<dyn AdminVerifier>,
}

impl ResetAuthority {
    /// Create a reset authority over the given store and verifier.
    pub fn new(store: Arc<dyn ControlStore>, verifier: Arc<dyn AdminVerifier>) -> Self {
        Self { store, verifier }
    }

    /// Reset `target` to ACTIVE.
    ///
    /// Requires a verified elevated principal and a non-empty reason; both
    /// are checked before any mutation. Commits one decision with
    /// `new_state = ACTIVE`; when `target` is GLOBAL the store disengages
    /// the fleet-wide override atomically with the same commit. Either the
    /// decision is durably written and the override cleared, or nothing
    /// changed.
    pub fn manual_reset(
        &self,
        target: &ControlTarget,
        admin_id: &str,
        credential: &str,
        reason: &str,
    ) -> Result<ControlDecision, ControlError> {
        if admin_id.trim().is_empty() {
            return Err(ControlError::validation("admin_id must be non-empty"));
        }
        if reason.trim().is_empty() {
            return Err(ControlError::validation("reset reason must be non-empty"));
        }
        if !self.verifier.is_elevated(admin_id, credential) {
            return Err(ControlError::Authorization {
                admin_id: admin_id.to_string(),
                message: "elevated privilege required for manual reset".to_string(),
            });
        }

        let audit_reason = format!("manual reset by {}: {}", admin_id, reason);
        let signal = ControlSignal::new(SignalSource::Manual, 0.0, reason)
            .with_metadata(json!({ "action": "manual_reset", "admin_id": admin_id }));

        let decision = self.store.commit(target, &mut |current| {
            tracing::warn!(
                target = %target,
                admin_id = %admin_id,
                from = %current,
                "manual reset to ACTIVE"
            );
            Ok(DecisionDraft {
                new_state: ControlState::Active,
                reason: audit_reason.clone(),
                signals: vec![signal.clone()],
                requires_manual_reset: false,
                global_kill_override: false,
            })
        })?;

        Ok(decision)
    }
}
