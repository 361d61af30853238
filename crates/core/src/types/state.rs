//! Control states, totally ordered by severity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Current disposition of a control target.
///
/// The derived `Ord` follows variant order, so
/// `Active < Throttled < Frozen < Killed` — the severity ordering every
/// state transition rule relies on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlState {
    /// Execution permitted without restriction.
    Active,
    /// Execution permitted; callers should reduce size and frequency.
    Throttled,
    /// Execution denied. Requires manual reset.
    Frozen,
    /// Execution denied, hard stop. Requires manual reset.
    Killed,
}

impl ControlState {
    /// `true` when the gate must deny execution for this state.
    pub fn blocks_execution(&self) -> bool {
        matches!(self, ControlState::Frozen | ControlState::Killed)
    }

    /// `true` when only a manual reset may lower this state.
    pub fn requires_manual_reset(&self) -> bool {
        self.blocks_execution()
    }

    /// Nominal severity of the state itself, on the same [0,1] scale as
    /// signal severities. Used when aggregating incoming signals against
    /// the current state.
    pub fn severity(&self) -> f64 {
        match self {
            ControlState::Active => 0.0,
            ControlState::Throttled => 0.4,
            ControlState::Frozen => 0.7,
            ControlState::Killed => 1.0,
        }
    }
}

impl fmt::Display for ControlState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlState::Active => write!(f, "ACTIVE"),
            ControlState::Throttled => write!(f, "THROTTLED"),
            ControlState::Frozen => write!(f, "FROZEN"),
            ControlState::Killed => write!(f, "KILLED"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(ControlState::Active < ControlState::Throttled);
        assert!(ControlState::Throttled < ControlState::Frozen);
        assert!(ControlState::Frozen < ControlState::Killed);
    }

    #[test]
    fn test_blocks_execution() {
        assert!(!ControlState::Active.blocks_execution());
        assert!(!ControlState::Throttled.blocks_execution());
        assert!(ControlState::Frozen.blocks_execution());
        assert!(ControlState::Killed.blocks_execution());
    }

    #[test]
    fn test_state_severity_matches_ordering() {
        let states = [
            ControlState::Active,
            ControlState::Throttled,
            ControlState::Frozen,
            ControlState::Killed,
        ];
        for pair in states.windows(2) {
            assert!(pair[0].severity() < pair[1].severity());
        }
    }

    #[test]
    fn test_serde_screaming_snake() {
        let json = serde_json::to_string(&ControlState::Throttled).unwrap();
        assert_eq!(json, "\"THROTTLED\"");
        let back: ControlState = serde_json::from_str("\"KILLED\"").unwrap();
        assert_eq!(back, ControlState::Killed);
    }
}
