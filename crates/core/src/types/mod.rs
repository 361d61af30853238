//! Domain types for the control plane.
//!
//! Everything that crosses a component boundary lives here: targets,
//! control states, signals, decisions, status aggregates, the strategy
//! health report contract, and timestamps.

mod decision;
mod health;
mod signal;
mod state;
mod status;
mod target;
mod timestamp;

pub use decision::{ControlDecision, DecisionId};
pub use health::{
    ExecutionRiskBreakdown, HealthStatus, RecommendedAction, StrategyHealthReport,
};
pub use signal::{ControlSignal, SignalSource};
pub use state::ControlState;
pub use status::ControlStatus;
pub use target::{ControlScope, ControlTarget, GLOBAL_TARGET_ID};
pub use timestamp::Timestamp;
