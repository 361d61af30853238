//! Control plane HTTP API.
//!
//! ## Endpoints
//!
//! - `POST /signals` — evaluate risk signals for a target
//! - `GET /gate?strategy_id=&user_id=&broker_id=` — execution gate check
//! - `POST /reset?token=<TOKEN>` — manual reset (requires operator token)
//! - `GET /state/:scope/:id` — current state of one target
//! - `GET /status` — fleet status aggregate
//! - `GET /audit?scope=&id=&start=&end=&limit=` — bounded audit query
//! - `POST /audit/rotate?token=<TOKEN>` — archive the decision journal
//! - `GET /health` — liveness check
//!
//! The reset token never appears in tracing fields; handlers log only the
//! outcome.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use tl_core::config::{AuditConfig, ControlConfig};
use tl_core::error::ControlError;
use tl_core::types::{
    ControlDecision, ControlScope, ControlSignal, ControlState, ControlStatus, ControlTarget,
    Timestamp,
};
use tl_control::{
    AdminVerifier, AuditQuery, ControlStore, ExecutionGate, GateVerdict, GlobalKillSwitch,
    MemoryStore, ResetAuthority, SignalEvaluator, StatusAggregator, TokenVerifier,
};

/// Shared state for all control-plane handlers.
pub struct AppState {
    pub evaluator: SignalEvaluator,
    pub gate: ExecutionGate,
    pub authority: ResetAuthority,
    pub aggregator: StatusAggregator,
    pub store: Arc<dyn ControlStore>,
    /// Concrete store handle, for journal administration.
    pub memory: Arc<MemoryStore>,
    /// Checks the operator token for reset and journal rotation.
    pub verifier: Arc<TokenVerifier>,
    pub audit: AuditConfig,
    /// `false` when no operator token is configured and reset is disabled.
    pub reset_enabled: bool,
}

/// Wire together the control plane components for the given configuration
/// and an already-constructed store.
pub fn build_state(
    config: &ControlConfig,
    store: Arc<MemoryStore>,
    kill_switch: Arc<GlobalKillSwitch>,
) -> Arc<AppState> {
    let store_dyn: Arc<dyn ControlStore> = store.clone();
    let verifier = Arc::new(TokenVerifier::new(config.admin_token.clone()));
    let reset_enabled = verifier.is_enabled();

    Arc::new(AppState {
        evaluator: SignalEvaluator::new(store_dyn.clone(), config.thresholds),
        gate: ExecutionGate::new(store_dyn.clone(), kill_switch.clone()),
        authority: ResetAuthority::new(store_dyn.clone(), verifier.clone()),
        aggregator: StatusAggregator::new(store_dyn.clone(), kill_switch),
        store: store_dyn,
        memory: store,
        verifier,
        audit: config.audit.clone(),
        reset_enabled,
    })
}

/// Build the control-plane axum router.
pub fn control_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/signals", post(signals_handler))
        .route("/gate", get(gate_handler))
        .route("/reset", post(reset_handler))
        .route("/state/:scope/:id", get(state_handler))
        .route("/status", get(status_handler))
        .route("/audit", get(audit_handler))
        .route("/audit/rotate", post(rotate_handler))
        .route("/health", get(health_handler))
        .with_state(state)
}

/// JSON error body for non-2xx responses.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// Map control errors to HTTP statuses: validation 400, authorization 401,
/// conflict 409 (retry), persistence 503 (retry later).
fn map_control_error(err: ControlError) -> ApiError {
    let status = match &err {
        ControlError::Validation { .. } => StatusCode::BAD_REQUEST,
        ControlError::Authorization { .. } => StatusCode::UNAUTHORIZED,
        ControlError::Conflict { .. } => StatusCode::CONFLICT,
        ControlError::Persistence { .. } => StatusCode::SERVICE_UNAVAILABLE,
    };
    api_error(status, err.to_string())
}

// ── POST /signals ──────────────────────────────────────────────────────

/// Request body for `POST /signals`.
#[derive(Debug, Deserialize)]
struct SignalsRequest {
    target: ControlTarget,
    signals: Vec<ControlSignal>,
}

/// `POST /signals` — evaluate a signal batch and return the decision.
async fn signals_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<SignalsRequest>,
) -> Result<Json<ControlDecision>, ApiError> {
    state
        .evaluator
        .evaluate(&req.target, &req.signals)
        .map(Json)
        .map_err(map_control_error)
}

// ── GET /gate ──────────────────────────────────────────────────────────

/// Query parameters for `GET /gate`.
#[derive(Debug, Deserialize)]
struct GateQuery {
    strategy_id: String,
    user_id: String,
    broker_id: Option<String>,
}

/// `GET /gate` — hot-path execution check for the order pipeline.
async fn gate_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<GateQuery>,
) -> Json<GateVerdict> {
    let verdict = state.gate.can_execute(
        &query.strategy_id,
        &query.user_id,
        query.broker_id.as_deref(),
    );
    Json(verdict)
}

// ── POST /reset ────────────────────────────────────────────────────────

/// Query parameters for `POST /reset`.
#[derive(Debug, Deserialize)]
struct ResetQuery {
    token: Option<String>,
}

/// Request body for `POST /reset`.
#[derive(Debug, Deserialize)]
struct ResetRequest {
    target: ControlTarget,
    admin_id: String,
    reason: String,
}

/// `POST /reset?token=<TOKEN>` — reset a target to ACTIVE.
///
/// Requires a valid operator token. If no token is configured on the
/// server, reset is disabled and every request is forbidden.
async fn reset_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResetQuery>,
    Json(req): Json<ResetRequest>,
) -> Result<Json<ControlDecision>, ApiError> {
    if !state.reset_enabled {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "manual reset is disabled: no operator token configured",
        ));
    }

    let credential = query.token.unwrap_or_default();
    state
        .authority
        .manual_reset(&req.target, &req.admin_id, &credential, &req.reason)
        .map(Json)
        .map_err(map_control_error)
}

// ── GET /state/:scope/:id ──────────────────────────────────────────────

/// Response for `GET /state/:scope/:id`.
#[derive(Debug, Serialize)]
struct StateResponse {
    target: ControlTarget,
    state: ControlState,
    /// `false` when the target has never received a signal (implicitly
    /// ACTIVE).
    tracked: bool,
}

/// `GET /state/:scope/:id` — current state of one target.
async fn state_handler(
    State(state): State<Arc<AppState>>,
    Path((scope, id)): Path<(String, String)>,
) -> Result<Json<StateResponse>, ApiError> {
    let scope = ControlScope::parse(&scope)
        .ok_or_else(|| api_error(StatusCode::BAD_REQUEST, format!("unknown scope '{}'", scope)))?;
    let target = ControlTarget::new(scope, id);

    let current = state
        .store
        .current_state(&target)
        .map_err(map_control_error)?;

    Ok(Json(StateResponse {
        target,
        state: current.unwrap_or(ControlState::Active),
        tracked: current.is_some(),
    }))
}

// ── GET /status ────────────────────────────────────────────────────────

/// `GET /status` — fleet status aggregate.
async fn status_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ControlStatus>, ApiError> {
    state
        .aggregator
        .status()
        .map(Json)
        .map_err(map_control_error)
}

// ── GET /audit ─────────────────────────────────────────────────────────

/// Query parameters for `GET /audit`.
#[derive(Debug, Deserialize)]
struct AuditParams {
    scope: Option<String>,
    id: Option<String>,
    /// Inclusive lower bound, milliseconds since the epoch.
    start: Option<u64>,
    /// Inclusive upper bound, milliseconds since the epoch.
    end: Option<u64>,
    limit: Option<usize>,
}

/// `GET /audit` — bounded audit-log query in ascending decision-id order.
async fn audit_handler(
    State(state): State<Arc<AppState>>,
    Query(params): Query<AuditParams>,
) -> Result<Json<Vec<ControlDecision>>, ApiError> {
    let target = match (&params.scope, &params.id) {
        (Some(scope), Some(id)) => {
            let scope = ControlScope::parse(scope).ok_or_else(|| {
                api_error(StatusCode::BAD_REQUEST, format!("unknown scope '{}'", scope))
            })?;
            Some(ControlTarget::new(scope, id.clone()))
        }
        (None, None) => None,
        _ => {
            return Err(api_error(
                StatusCode::BAD_REQUEST,
                "audit filter requires both scope and id",
            ))
        }
    };

    let limit = params
        .limit
        .unwrap_or(state.audit.default_limit)
        .min(state.audit.max_limit)
        .max(1);

    let query = AuditQuery {
        target,
        start: params.start.map(Timestamp::from_millis),
        end: params.end.map(Timestamp::from_millis),
        limit,
    };

    state
        .store
        .audit(&query)
        .map(Json)
        .map_err(map_control_error)
}

// ── POST /audit/rotate ─────────────────────────────────────────────────

/// Response for `POST /audit/rotate`.
#[derive(Debug, Serialize)]
struct RotateResponse {
    /// Path of the archived journal file, or `null` when the store keeps
    /// its audit trail in memory only.
    rotated: Option<String>,
}

/// `POST /audit/rotate?token=<TOKEN>` — archive the decision journal and
/// start a fresh file.
///
/// Guarded by the same operator token as `/reset`. Decisions already
/// replayed into memory stay queryable; only the on-disk file rolls over.
async fn rotate_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ResetQuery>,
) -> Result<Json<RotateResponse>, ApiError> {
    if !state.reset_enabled {
        return Err(api_error(
            StatusCode::FORBIDDEN,
            "journal rotation is disabled: no operator token configured",
        ));
    }

    let credential = query.token.unwrap_or_default();
    if !state.verifier.is_elevated("operator", &credential) {
        return Err(api_error(StatusCode::UNAUTHORIZED, "invalid operator token"));
    }

    let rotated = state.memory.rotate_journal().map_err(map_control_error)?;
    if let Some(path) = &rotated {
        tracing::info!(rotated = %path.display(), "decision journal rotated");
    }
    Ok(Json(RotateResponse {
        rotated: rotated.map(|p| p.display().to_string()),
    }))
}

// ── GET /health ────────────────────────────────────────────────────────

/// JSON response for the `/health` endpoint.
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// `GET /health` — simple liveness check.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}
