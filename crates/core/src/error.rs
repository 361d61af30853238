//! Control-plane error taxonomy.
//!
//! Four classes, matching how callers must react: fix the request
//! (`Validation`), obtain privilege (`Authorization`), retry the write
//! (`Conflict`), or retry/queue against the store (`Persistence`).
//! Validation and authorization failures are always raised before any
//! state mutation.

/// Error returned by control-plane operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ControlError {
    /// Malformed target or signal — bad severity, empty signal list,
    /// unknown enum value. Rejected before any mutation.
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// Manual reset attempted without verified elevated privilege.
    #[error("authorization failed for admin '{admin_id}': {message}")]
    Authorization { admin_id: String, message: String },

    /// A concurrent write lost a race on the same target. Retry the
    /// evaluation.
    #[error("write conflict on target {target}: {message}")]
    Conflict { target: String, message: String },

    /// The durable store is unreachable or a write failed. No partial
    /// state is visible.
    #[error("persistence failure: {message}")]
    Persistence { message: String },
}

impl ControlError {
    /// Shorthand for a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ControlError::Validation {
            message: message.into(),
        }
    }

    /// Shorthand for a persistence error.
    pub fn persistence(message: impl Into<String>) -> Self {
        ControlError::Persistence {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_validation() {
        let err = ControlError::validation("signals must be non-empty");
        assert_eq!(
            format!("{}", err),
            "validation failed: signals must be non-empty"
        );
    }

    #[test]
    fn test_display_authorization() {
        let err = ControlError::Authorization {
            admin_id: "A1".into(),
            message: "unknown principal".into(),
        };
        assert!(format!("{}", err).contains("A1"));
    }
}
