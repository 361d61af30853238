//! Control targets: the entities whose trading activity can be gated.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed identifier of the GLOBAL singleton target.
pub const GLOBAL_TARGET_ID: &str = "GLOBAL";

/// Kind of entity a control decision applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ControlScope {
    /// A single trading strategy.
    Strategy,
    /// A platform user (all of their strategies).
    User,
    /// A broker connection.
    Broker,
    /// The whole fleet. Singleton target with id [`GLOBAL_TARGET_ID`].
    Global,
}

impl ControlScope {
    /// Parse from the wire representation, rejecting unknown values.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "STRATEGY" => Some(ControlScope::Strategy),
            "USER" => Some(ControlScope::User),
            "BROKER" => Some(ControlScope::Broker),
            "GLOBAL" => Some(ControlScope::Global),
            _ => None,
        }
    }
}

impl fmt::Display for ControlScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlScope::Strategy => write!(f, "STRATEGY"),
            ControlScope::User => write!(f, "USER"),
            ControlScope::Broker => write!(f, "BROKER"),
            ControlScope::Global => write!(f, "GLOBAL"),
        }
    }
}

/// Composite key identifying a controllable entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ControlTarget {
    /// The kind of entity.
    pub scope: ControlScope,
    /// Entity identifier within the scope.
    pub id: String,
}

impl ControlTarget {
    /// Create a target for the given scope and id.
    pub fn new(scope: ControlScope, id: impl Into<String>) -> Self {
        Self {
            scope,
            id: id.into(),
        }
    }

    /// The GLOBAL singleton target.
    pub fn global() -> Self {
        Self::new(ControlScope::Global, GLOBAL_TARGET_ID)
    }

    /// A STRATEGY-scoped target.
    pub fn strategy(id: impl Into<String>) -> Self {
        Self::new(ControlScope::Strategy, id)
    }

    /// A USER-scoped target.
    pub fn user(id: impl Into<String>) -> Self {
        Self::new(ControlScope::User, id)
    }

    /// A BROKER-scoped target.
    pub fn broker(id: impl Into<String>) -> Self {
        Self::new(ControlScope::Broker, id)
    }

    /// `true` for the GLOBAL singleton.
    pub fn is_global(&self) -> bool {
        self.scope == ControlScope::Global
    }
}

impl fmt::Display for ControlTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scope, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_display() {
        assert_eq!(format!("{}", ControlScope::Strategy), "STRATEGY");
        assert_eq!(format!("{}", ControlScope::Global), "GLOBAL");
    }

    #[test]
    fn test_scope_parse_known() {
        assert_eq!(ControlScope::parse("USER"), Some(ControlScope::User));
        assert_eq!(ControlScope::parse("BROKER"), Some(ControlScope::Broker));
    }

    #[test]
    fn test_scope_parse_unknown_rejected() {
        assert_eq!(ControlScope::parse("user"), None);
        assert_eq!(ControlScope::parse("EXCHANGE"), None);
    }

    #[test]
    fn test_global_target() {
        let g = ControlTarget::global();
        assert!(g.is_global());
        assert_eq!(g.id, GLOBAL_TARGET_ID);
        assert_eq!(format!("{}", g), "GLOBAL:GLOBAL");
    }

    #[test]
    fn test_target_key_equality() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(ControlTarget::strategy("S1"));
        assert!(set.contains(&ControlTarget::strategy("S1")));
        assert!(!set.contains(&ControlTarget::user("S1")));
    }
}
