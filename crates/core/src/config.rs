//! Layered configuration for the TradeLab control plane.
//!
//! Configuration is loaded in layers with increasing priority:
//! 1. Compiled-in defaults (conservative thresholds, small audit limits)
//! 2. TOML configuration file (if provided)
//! 3. Environment variable overrides (prefix `TL_CONTROL_`, nested with `__`)
//! 4. The admin reset token from `TL_ADMIN_TOKEN`
//!
//! The admin token **must** come from the environment, never from a
//! configuration file, to keep it out of checked-in config.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;

/// Default number of records returned by an audit query. Shared with the
/// store's query type so an unconfigured query never comes back empty.
pub const DEFAULT_AUDIT_LIMIT: usize = 100;

// ── Default value functions ────────────────────────────────────────────

/// Default THROTTLED cutoff: severity ≥ 0.40.
fn default_throttled() -> f64 {
    0.40
}

/// Default FROZEN cutoff: severity ≥ 0.70.
fn default_frozen() -> f64 {
    0.70
}

/// Default KILLED cutoff: severity ≥ 0.95.
fn default_killed() -> f64 {
    0.95
}

/// Default audit query limit.
fn default_audit_limit() -> usize {
    DEFAULT_AUDIT_LIMIT
}

/// Maximum audit query limit: 1 000 records.
fn default_audit_max_limit() -> usize {
    1_000
}

/// Default HTTP listen port.
fn default_port() -> u16 {
    8090
}

// ── Configuration structs ──────────────────────────────────────────────

/// Top-level control-plane configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    /// Severity-to-state thresholds for the signal evaluator.
    #[serde(default)]
    pub thresholds: ThresholdConfig,
    /// Audit journal and query settings.
    #[serde(default)]
    pub audit: AuditConfig,
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Admin reset token — loaded from `TL_ADMIN_TOKEN`, never from TOML.
    /// `None` disables manual reset entirely.
    #[serde(skip)]
    pub admin_token: Option<String>,
}

/// Severity cutoffs mapping aggregate severity to a control state.
///
/// A severity `s` maps to KILLED when `s >= killed`, FROZEN when
/// `s >= frozen`, THROTTLED when `s >= throttled`, otherwise ACTIVE.
/// Cutoffs are policy, not hard law — but they must preserve the state
/// severity ordering, which [`ControlConfig::validate`] enforces.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ThresholdConfig {
    /// Minimum severity for THROTTLED.
    #[serde(default = "default_throttled")]
    pub throttled: f64,
    /// Minimum severity for FROZEN.
    #[serde(default = "default_frozen")]
    pub frozen: f64,
    /// Minimum severity for KILLED.
    #[serde(default = "default_killed")]
    pub killed: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            throttled: default_throttled(),
            frozen: default_frozen(),
            killed: default_killed(),
        }
    }
}

/// Audit journal and query settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AuditConfig {
    /// Path to the JSONL decision journal. `None` keeps the audit trail
    /// in memory only (tests, ephemeral deployments).
    #[serde(default)]
    pub journal_path: Option<PathBuf>,
    /// Default number of records returned by an audit query.
    #[serde(default = "default_audit_limit")]
    pub default_limit: usize,
    /// Hard cap on a single audit query.
    #[serde(default = "default_audit_max_limit")]
    pub max_limit: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            journal_path: None,
            default_limit: default_audit_limit(),
            max_limit: default_audit_max_limit(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// TCP port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Emit JSON logs (production) instead of pretty logs (development).
    #[serde(default)]
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            json_logs: false,
        }
    }
}

impl ControlConfig {
    /// Load configuration using layered sources.
    ///
    /// 1. Compiled-in defaults.
    /// 2. TOML file at `config_path` (if `Some`).
    /// 3. Environment variable overrides with prefix `TL_CONTROL_` and
    ///    `__` as the nesting separator (e.g.,
    ///    `TL_CONTROL_THRESHOLDS__FROZEN=0.65`).
    /// 4. The admin token from `TL_ADMIN_TOKEN`.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("thresholds.throttled", default_throttled())?
            .set_default("thresholds.frozen", default_frozen())?
            .set_default("thresholds.killed", default_killed())?
            .set_default("audit.default_limit", default_audit_limit() as i64)?
            .set_default("audit.max_limit", default_audit_max_limit() as i64)?
            .set_default("server.port", default_port() as i64)?
            .set_default("server.json_logs", false)?;

        if let Some(path) = config_path {
            let path_str = path.to_str().context("config path is not valid UTF-8")?;
            builder = builder.add_source(File::with_name(path_str).required(true));
        }

        // The prefix separator must be set explicitly to `_` because the
        // `config` crate defaults it to the nesting separator when one is
        // provided. Without this, `TL_CONTROL_THRESHOLDS__FROZEN` would be
        // matched against prefix `tl_control__` instead of `tl_control_`.
        builder = builder.add_source(
            Environment::with_prefix("TL_CONTROL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let mut cfg: ControlConfig = builder
            .build()
            .context("failed to build configuration")?
            .try_deserialize()
            .context("failed to deserialize configuration")?;

        cfg.admin_token = std::env::var("TL_ADMIN_TOKEN").ok().filter(|t| !t.is_empty());

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration invariants.
    ///
    /// Thresholds must lie in `(0, 1]` and preserve the state ordering
    /// `throttled < frozen < killed`; audit limits must be sane.
    fn validate(&self) -> Result<()> {
        let t = &self.thresholds;
        if !(t.throttled > 0.0 && t.throttled <= 1.0)
            || !(t.frozen > 0.0 && t.frozen <= 1.0)
            || !(t.killed > 0.0 && t.killed <= 1.0)
        {
            bail!("thresholds must lie in (0, 1]");
        }
        if !(t.throttled < t.frozen && t.frozen < t.killed) {
            bail!(
                "thresholds must preserve state ordering: throttled ({}) < frozen ({}) < killed ({})",
                t.throttled,
                t.frozen,
                t.killed
            );
        }
        if self.audit.default_limit == 0 || self.audit.default_limit > self.audit.max_limit {
            bail!(
                "audit.default_limit ({}) must be in 1..=audit.max_limit ({})",
                self.audit.default_limit,
                self.audit.max_limit
            );
        }
        Ok(())
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            thresholds: ThresholdConfig::default(),
            audit: AuditConfig::default(),
            server: ServerConfig::default(),
            admin_token: None,
        }
    }
}
