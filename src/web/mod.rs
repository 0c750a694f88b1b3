use axum::{
    http::Method,
    middleware as axum_middleware,
    routing::get,
    Json,
    Router,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::monitoring::CheckRunner;
use crate::services::auth_service::TokenService;
use crate::web::{middleware::auth, routes::*};

pub use error::AppError;

pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;

#[cfg(test)]
pub(crate) mod testing;

#[derive(Clone)]
pub struct AppState {
    pub db_pool: DatabaseConnection,
    pub check_runner: CheckRunner,
    pub token_service: Arc<TokenService>,
}

async fn health_check_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

pub fn create_axum_router(
    db_pool: DatabaseConnection,
    check_runner: CheckRunner,
    token_service: Arc<TokenService>,
) -> Router {
    let app_state = Arc::new(AppState {
        db_pool,
        check_runner,
        token_service,
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(vec![
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(health_check_handler))
        .nest(
            "/api/endpoints",
            endpoint_routes::create_endpoint_router()
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
        )
        .nest(
            "/api/notifications",
            notification_routes::create_notification_router()
                .route_layer(axum_middleware::from_fn_with_state(app_state.clone(), auth::auth)),
        )
        .with_state(app_state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
