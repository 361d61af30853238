//! Risk signals consumed by the signal evaluator.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::Timestamp;

/// Subsystem that produced a risk signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalSource {
    /// Fill/position mismatch from the reconciliation engine.
    Reconciliation,
    /// Degradation report from the strategy health monitor.
    StrategyHealth,
    /// Behavioral anomaly detector.
    Behavior,
    /// Execution-quality risk (slippage, partial fills).
    Execution,
    /// Pre-computed risk breach (drawdown, exposure).
    Risk,
    /// Human operator intervention.
    Manual,
}

impl fmt::Display for SignalSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignalSource::Reconciliation => write!(f, "RECONCILIATION"),
            SignalSource::StrategyHealth => write!(f, "STRATEGY_HEALTH"),
            SignalSource::Behavior => write!(f, "BEHAVIOR"),
            SignalSource::Execution => write!(f, "EXECUTION"),
            SignalSource::Risk => write!(f, "RISK"),
            SignalSource::Manual => write!(f, "MANUAL"),
        }
    }
}

/// Metadata key carrying explicit manual intent on MANUAL signals.
pub const METADATA_ACTION_KEY: &str = "action";

/// Metadata value requesting an immediate fleet-wide kill.
pub const ACTION_GLOBAL_KILL: &str = "global_kill";

/// A single risk signal. Always consumed within one evaluation call,
/// never stored standalone — it survives only inside the decision that
/// consumed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlSignal {
    /// Producing subsystem.
    pub source: SignalSource,
    /// Normalized danger level in `[0, 1]`.
    pub severity: f64,
    /// Human-readable cause, carried into the audit record.
    pub reason: String,
    /// When the producer observed the condition.
    pub timestamp: Timestamp,
    /// Optional structured context (e.g. `{"action": "global_kill"}`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl ControlSignal {
    /// Create a signal with the current timestamp and no metadata.
    pub fn new(source: SignalSource, severity: f64, reason: impl Into<String>) -> Self {
        Self {
            source,
            severity,
            reason: reason.into(),
            timestamp: Timestamp::now(),
            metadata: None,
        }
    }

    /// Attach structured metadata.
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// `true` if this is a MANUAL signal carrying explicit global-kill intent.
    pub fn is_global_kill(&self) -> bool {
        self.source == SignalSource::Manual
            && self
                .metadata
                .as_ref()
                .and_then(|m| m.get(METADATA_ACTION_KEY))
                .and_then(|v| v.as_str())
                == Some(ACTION_GLOBAL_KILL)
    }
}
