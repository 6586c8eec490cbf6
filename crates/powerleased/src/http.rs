//! HTTP surface of the power service

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use powerlease_api::{
    API_VERSION, DELETE_PATH, DeleteResponse, ErrorBody, HEALTH_PATH, HealthResponse, LIST_PATH,
    LeaseView, RENEW_PATH, RenewQuery, RenewResponse, STATUS_PATH, StatusResponse,
};
use powerlease_core::{CoreError, PowerService};
use powerlease_util::LeaseId;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PowerService>,
}

/// Build the lease API router
pub fn router(service: Arc<PowerService>) -> Router {
    Router::new()
        .route(RENEW_PATH, get(renew_lease))
        .route(DELETE_PATH, get(delete_lease))
        .route(LIST_PATH, get(list_leases))
        .route(STATUS_PATH, get(status))
        .route(HEALTH_PATH, get(health))
        .with_state(AppState { service })
}

/// Service failure rendered as 500 + `{"error": ...}`
pub struct ApiError(CoreError);

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self.0, "Request failed");
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// GET /tokens/update?id=&expire_in_sec=
async fn renew_lease(
    State(state): State<AppState>,
    Query(query): Query<RenewQuery>,
) -> Result<Json<RenewResponse>, ApiError> {
    let ttl = query.expire_in_sec.map(Duration::from_secs);
    let id = state.service.renew_lease(query.id, ttl)?;
    Ok(Json(RenewResponse { id }))
}

/// GET /tokens/delete/{id}
async fn delete_lease(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.service.delete_lease(&LeaseId::new(id))?;
    Ok(Json(DeleteResponse { deleted }))
}

/// GET /tokens/list
async fn list_leases(State(state): State<AppState>) -> Result<Json<Vec<LeaseView>>, ApiError> {
    let leases = state
        .service
        .list_leases()?
        .into_iter()
        .map(|lease| LeaseView {
            id: lease.id,
            expire_time: lease.expire_at.map(|at| at.timestamp()),
        })
        .collect();
    Ok(Json(leases))
}

/// GET /status
async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        online: state.service.is_online().await,
    })
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        api_version: API_VERSION,
        store_healthy: state.service.is_store_healthy(),
    })
}
