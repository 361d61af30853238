//! # tl-control
//!
//! The TradeLab global control plane: a centralized risk circuit breaker
//! deciding, for every trading action, whether execution is permitted.
//! Producers feed risk signals into the [`SignalEvaluator`], which persists
//! one immutable [`ControlDecision`](tl_core::types::ControlDecision) per
//! call and maintains a per-target current-state index. The order pipeline
//! consults the [`ExecutionGate`] on every submission; severe states can
//! only be cleared through the [`ResetAuthority`].

pub mod evaluator;
pub mod gate;
pub mod health;
pub mod journal;
pub mod kill_switch;
pub mod reset;
pub mod status;
pub mod store;

pub use evaluator::SignalEvaluator;
pub use gate::{ExecutionGate, GateVerdict};
pub use journal::DecisionJournal;
pub use kill_switch::{GlobalKillSwitch, KillSwitchStatus};
pub use reset::{AdminVerifier, ResetAuthority, TokenVerifier};
pub use status::StatusAggregator;
pub use store::{AuditQuery, ControlStore, DecisionDraft, MemoryStore};
