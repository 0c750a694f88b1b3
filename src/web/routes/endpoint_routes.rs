use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::info;

use crate::db::entities::endpoint;
use crate::db::services::{check_log_service, endpoint_service};
use crate::monitoring::stats;
use crate::web::models::AuthenticatedOwner;
use crate::web::models::endpoint_models::{
    CheckResponse, CreateEndpoint, EndpointDetails, StatsQuery, StatsResponse, UpdateEndpoint,
};
use crate::web::{AppError, AppState};

const LIST_RECENT_LOGS: u64 = 10;
const DETAIL_RECENT_LOGS: u64 = 100;
pub const DEFAULT_STATS_WINDOW_SECS: i64 = 24 * 3600;
const MAX_STATS_WINDOW_SECS: i64 = 366 * 86400;

pub fn create_endpoint_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_endpoints).post(create_endpoint))
        .route(
            "/{id}",
            get(get_endpoint).put(update_endpoint).delete(delete_endpoint),
        )
        .route("/{id}/check", post(check_endpoint))
        .route("/{id}/stats", get(get_endpoint_stats))
}

/// Parses `30s`, `15m`, `24h`, `7d` or plain seconds.
pub fn parse_window_to_seconds(window: &str) -> Option<i64> {
    let s = window.trim();
    if let Some(seconds_str) = s.strip_suffix('s') {
        seconds_str.parse::<i64>().ok()
    } else if let Some(minutes_str) = s.strip_suffix('m') {
        minutes_str.parse::<i64>().ok().and_then(|m| m.checked_mul(60))
    } else if let Some(hours_str) = s.strip_suffix('h') {
        hours_str.parse::<i64>().ok().and_then(|h| h.checked_mul(3600))
    } else if let Some(days_str) = s.strip_suffix('d') {
        days_str.parse::<i64>().ok().and_then(|d| d.checked_mul(86400))
    } else {
        s.parse::<i64>().ok()
    }
}

async fn owned_endpoint(
    app_state: &AppState,
    endpoint_id: i32,
    owner: &AuthenticatedOwner,
) -> Result<endpoint::Model, AppError> {
    endpoint_service::get_endpoint_for_owner(&app_state.db_pool, endpoint_id, &owner.owner_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Endpoint not found".to_string()))
}

async fn list_endpoints(
    Extension(owner): Extension<AuthenticatedOwner>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<Vec<EndpointDetails>>, AppError> {
    let endpoints =
        endpoint_service::get_endpoints_for_owner(&app_state.db_pool, &owner.owner_id).await?;
    let ids: Vec<i32> = endpoints.iter().map(|e| e.id).collect();
    let logs =
        check_log_service::get_recent_logs_for_endpoints(&app_state.db_pool, &ids, LIST_RECENT_LOGS)
            .await?;

    let details = endpoints
        .into_iter()
        .zip(logs)
        .map(|(endpoint, recent_logs)| EndpointDetails {
            endpoint,
            recent_logs,
        })
        .collect();
    Ok(Json(details))
}

async fn create_endpoint(
    Extension(owner): Extension<AuthenticatedOwner>,
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<CreateEndpoint>,
) -> Result<(StatusCode, Json<endpoint::Model>), AppError> {
    payload.validate().map_err(AppError::InvalidInput)?;
    let created =
        endpoint_service::create_endpoint(&app_state.db_pool, &owner.owner_id, payload).await?;
    info!(endpoint_id = created.id, owner_id = %owner.owner_id, "Endpoint created.");
    Ok((StatusCode::CREATED, Json(created)))
}

async fn get_endpoint(
    Extension(owner): Extension<AuthenticatedOwner>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<EndpointDetails>, AppError> {
    let endpoint = owned_endpoint(&app_state, id, &owner).await?;
    let recent_logs =
        check_log_service::get_recent_logs(&app_state.db_pool, endpoint.id, DETAIL_RECENT_LOGS)
            .await?;
    Ok(Json(EndpointDetails {
        endpoint,
        recent_logs,
    }))
}

async fn update_endpoint(
    Extension(owner): Extension<AuthenticatedOwner>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateEndpoint>,
) -> Result<Json<endpoint::Model>, AppError> {
    payload.validate().map_err(AppError::InvalidInput)?;
    let updated =
        endpoint_service::update_endpoint(&app_state.db_pool, id, &owner.owner_id, payload).await?;
    Ok(Json(updated))
}

async fn delete_endpoint(
    Extension(owner): Extension<AuthenticatedOwner>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    let rows_affected =
        endpoint_service::delete_endpoint(&app_state.db_pool, id, &owner.owner_id).await?;
    if rows_affected == 0 {
        return Err(AppError::NotFound("Endpoint not found".to_string()));
    }
    info!(endpoint_id = id, owner_id = %owner.owner_id, "Endpoint deleted.");
    Ok(StatusCode::NO_CONTENT)
}

/// Runs one check synchronously. Probe failures are part of the response
/// body, not an error status.
async fn check_endpoint(
    Extension(owner): Extension<AuthenticatedOwner>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<CheckResponse>, AppError> {
    let endpoint = owned_endpoint(&app_state, id, &owner).await?;
    let report = app_state.check_runner.check_now(endpoint.id).await?;

    Ok(Json(CheckResponse {
        endpoint_id: report.endpoint_id,
        outcome: report.outcome,
        previous_status: report.transition.previous,
        status: report.transition.new_status,
        log: report.log,
        notification_created: report.notification.is_some(),
    }))
}

async fn get_endpoint_stats(
    Extension(owner): Extension<AuthenticatedOwner>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    Query(query): Query<StatsQuery>,
) -> Result<Json<StatsResponse>, AppError> {
    let window_seconds = match query.window.as_deref() {
        None => DEFAULT_STATS_WINDOW_SECS,
        Some(raw) => parse_window_to_seconds(raw)
            .filter(|secs| (1..=MAX_STATS_WINDOW_SECS).contains(secs))
            .ok_or_else(|| AppError::InvalidInput(format!("Invalid stats window '{raw}'")))?,
    };

    let endpoint = owned_endpoint(&app_state, id, &owner).await?;
    let now = Utc::now();
    let window = Duration::seconds(window_seconds);
    let stats = stats::stats(&app_state.db_pool, endpoint.id, window, now).await?;

    Ok(Json(StatsResponse {
        endpoint_id: endpoint.id,
        window_seconds,
        from: (now - window).to_rfc3339(),
        to: now.to_rfc3339(),
        stats,
    }))
}
