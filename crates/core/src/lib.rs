//! # tl-core
//!
//! Shared foundation for the TradeLab global control plane: domain types
//! (targets, signals, states, decisions), the control-plane error taxonomy,
//! layered configuration, and tracing initialization.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;
