//! Drives the full router in-process for route tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use http_body_util::BodyExt;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use tower::ServiceExt;

use crate::db::testing::memory_db;
use crate::monitoring::{CheckRunner, HealthProbe};
use crate::services::auth_service::TokenService;
use crate::web::create_axum_router;

pub(crate) struct TestApp {
    pub router: Router,
    pub db: DatabaseConnection,
    pub tokens: Arc<TokenService>,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = memory_db().await;
        let tokens = Arc::new(TokenService::new("route-test-secret"));
        let runner = CheckRunner::new(
            db.clone(),
            HealthProbe::new().expect("build client"),
            std::time::Duration::from_secs(30),
        );
        let router = create_axum_router(db.clone(), runner, tokens.clone());
        Self { router, db, tokens }
    }

    /// Sends a request as `owner` (or anonymously) and returns the status
    /// with the JSON body, `Value::Null` when the body is empty.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        owner: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let token = owner.map(|owner| {
            self.tokens
                .issue_token(owner, Duration::hours(1))
                .expect("issue token")
        });
        self.send(method, uri, token.as_deref(), body).await
    }

    pub async fn request_with_token(&self, method: Method, uri: &str, token: &str) -> (StatusCode, Value) {
        self.send(method, uri, Some(token), None).await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("build request");

        let response = self.router.clone().oneshot(request).await.expect("route request");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("read body")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, value)
    }
}
