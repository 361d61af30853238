//! # tl-server
//!
//! HTTP surface for the TradeLab control plane. Producers post signals,
//! the order pipeline queries the gate, and operators reset targets and
//! inspect status and audit history.

pub mod routes;

pub use routes::{build_state, control_router, AppState};
