//! API Handlers
//!
//! HTTP request handlers for each offline cache endpoint.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde_json::Value;

use crate::api::Upstream;
use crate::error::{OfflineError, Result};
use crate::manager::OfflineManager;
use crate::models::{
    ApiQuery, ClearResponse, ConnectivityRequest, GetResponse, HealthResponse, SetRequest,
    SetResponse, StatsResponse, StatusResponse, SweepResponse,
};
use crate::offline_api::{CallOptions, OfflineApi};
use crate::queue::SyncReport;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The offline cache service
    pub manager: OfflineManager,
    /// Offline-aware caller over `manager`
    pub api: OfflineApi,
    /// Backend served under `/api`, if configured
    pub upstream: Option<Upstream>,
}

impl AppState {
    /// Creates a new AppState around the given manager.
    pub fn new(manager: OfflineManager) -> Self {
        Self {
            api: OfflineApi::new(manager.clone()),
            manager,
            upstream: None,
        }
    }

    /// Enables the `/api` read-through route.
    pub fn with_upstream(mut self, upstream: Upstream) -> Self {
        self.upstream = Some(upstream);
        self
    }
}

/// Handler for PUT /cache
///
/// Stores a JSON value in the cache with optional TTL.
pub async fn set_handler(
    State(state): State<AppState>,
    Json(req): Json<SetRequest>,
) -> Result<Json<SetResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(OfflineError::InvalidRequest(error_msg));
    }

    let ttl = req.ttl();
    state.manager.set_cache(&req.key, req.data, ttl);

    Ok(Json(SetResponse::new(req.key)))
}

/// Handler for GET /cache/:key
pub async fn get_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<GetResponse>> {
    let entry = state
        .manager
        .get_cache_entry(&key)
        .ok_or(OfflineError::NotFound(key))?;

    Ok(Json(GetResponse::from_entry(entry, state.manager.now_ms())))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.manager.clear_cache();
    Json(ClearResponse::new())
}

/// Handler for POST /cache/sweep
pub async fn sweep_handler(State(state): State<AppState>) -> Json<SweepResponse> {
    let removed = state.manager.clear_expired_cache();
    Json(SweepResponse { removed })
}

/// Handler for GET /status
///
/// Returns the connectivity signal and how many requests are queued.
pub async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        connectivity: state.manager.connectivity(),
        pending_requests: state.manager.pending_request_count(),
    })
}

/// Handler for PUT /connectivity
///
/// Lets the host report online/offline transitions and network quality.
pub async fn connectivity_handler(
    State(state): State<AppState>,
    Json(req): Json<ConnectivityRequest>,
) -> Json<StatusResponse> {
    if req.online {
        state.manager.set_online();
    } else {
        state.manager.set_offline();
    }
    if req.connection_type.is_some() {
        state
            .manager
            .set_connection_type(req.connection_type.as_deref());
    }

    status_handler(State(state)).await
}

/// Handler for POST /sync
///
/// Runs a sync pass immediately instead of waiting for the timer.
pub async fn sync_handler(State(state): State<AppState>) -> Json<SyncReport> {
    Json(state.manager.sync_pending_requests().await)
}

/// Handler for GET /stats
pub async fn stats_handler(State(state): State<AppState>) -> Json<StatsResponse> {
    let stats = state.manager.stats();
    Json(StatsResponse::new(
        &stats,
        state.manager.pending_request_count(),
    ))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /api/*path
///
/// Reads `path` from the upstream backend through the offline cache.
pub async fn api_handler(
    State(state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<ApiQuery>,
) -> Result<Json<Value>> {
    let upstream = state
        .upstream
        .clone()
        .ok_or_else(|| OfflineError::NotFound(format!("api/{path}")))?;

    let key = format!("api:{}", path);
    let options = CallOptions {
        ttl: upstream.ttl,
        force_refresh: query.refresh,
        fallback_data: None,
    };

    let data = state
        .api
        .call(&key, move || upstream.fetch(&path), options)
        .await?;

    Ok(Json(data))
}
