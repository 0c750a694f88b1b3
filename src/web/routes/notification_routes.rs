use axum::{
    Extension, Json, Router,
    extract::{Path, State},
    routing::{delete, get, patch},
};
use std::sync::Arc;

use crate::db::entities::notification;
use crate::db::services::notification_service;
use crate::web::models::AuthenticatedOwner;
use crate::web::models::notification_models::{DeletedNotifications, NotificationList};
use crate::web::{AppError, AppState};

pub fn create_notification_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/{id}/read", patch(mark_notification_read))
        .route("/clear-all", delete(clear_read_notifications))
}

async fn list_notifications(
    Extension(owner): Extension<AuthenticatedOwner>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<NotificationList>, AppError> {
    let notifications = notification_service::get_notifications_for_owner(
        &app_state.db_pool,
        &owner.owner_id,
        notification_service::NOTIFICATION_LIST_LIMIT,
    )
    .await?;
    let unread = notifications.iter().filter(|n| !n.read).count();
    Ok(Json(NotificationList {
        unread,
        notifications,
    }))
}

async fn mark_notification_read(
    Extension(owner): Extension<AuthenticatedOwner>,
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> Result<Json<notification::Model>, AppError> {
    notification_service::mark_as_read(&app_state.db_pool, id, &owner.owner_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Notification not found".to_string()))
}

async fn clear_read_notifications(
    Extension(owner): Extension<AuthenticatedOwner>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<DeletedNotifications>, AppError> {
    let deleted =
        notification_service::delete_read_notifications(&app_state.db_pool, &owner.owner_id)
            .await?;
    Ok(Json(DeletedNotifications { deleted }))
}

#[cfg(test)]
mod tests {
    use crate::db::enums::NotificationType;
    use crate::db::services::notification_service;
    use crate::db::testing::insert_endpoint;
    use crate::web::testing::TestApp;
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn owner_can_list_read_and_clear_notifications() {
        let app = TestApp::new().await;
        let endpoint = insert_endpoint(&app.db, "alice", "http://alerts.test").await;
        let first = notification_service::create_notification(
            &app.db,
            "alice",
            endpoint.id,
            NotificationType::Down,
            "Endpoint api is now down".to_string(),
        )
        .await
        .unwrap();
        notification_service::create_notification(
            &app.db,
            "alice",
            endpoint.id,
            NotificationType::Recovered,
            "Endpoint api is now active".to_string(),
        )
        .await
        .unwrap();

        let (status, list) = app.request(Method::GET, "/api/notifications", Some("alice"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["unread"], 2);
        assert_eq!(list["notifications"][0]["notificationType"], "RECOVERED");

        let (_, bob_list) = app.request(Method::GET, "/api/notifications", Some("bob"), None).await;
        assert!(bob_list["notifications"].as_array().unwrap().is_empty());

        let read_uri = format!("/api/notifications/{}/read", first.id);
        let (status, _) = app.request(Method::PATCH, &read_uri, Some("bob"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, read) = app.request(Method::PATCH, &read_uri, Some("alice"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(read["read"], true);

        let (status, cleared) = app
            .request(Method::DELETE, "/api/notifications/clear-all", Some("alice"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(cleared["deleted"], 1);

        let (_, list) = app.request(Method::GET, "/api/notifications", Some("alice"), None).await;
        assert_eq!(list["notifications"].as_array().unwrap().len(), 1);
        assert_eq!(list["unread"], 1);
    }
}
