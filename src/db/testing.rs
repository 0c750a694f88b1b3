//! Shared fixtures for database-backed tests.

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Set};

use crate::db::entities::{check_log, endpoint};
use crate::db::schema;

/// A fresh in-memory SQLite database with the monitoring schema.
///
/// A single pooled connection keeps every query on the same in-memory
/// database.
pub(crate) async fn memory_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect to in-memory sqlite");
    schema::create_tables(&db).await.expect("create schema");
    db
}

pub(crate) async fn insert_endpoint(
    db: &DatabaseConnection,
    owner_id: &str,
    url: &str,
) -> endpoint::Model {
    insert_endpoint_with_timeout(db, owner_id, url, 5_000).await
}

pub(crate) async fn insert_endpoint_with_timeout(
    db: &DatabaseConnection,
    owner_id: &str,
    url: &str,
    timeout_ms: i32,
) -> endpoint::Model {
    let now = Utc::now();
    endpoint::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        name: Set(format!("endpoint {url}")),
        url: Set(url.to_string()),
        check_interval_ms: Set(60_000),
        timeout_ms: Set(timeout_ms),
        headers: Set(None),
        status: Set(None),
        last_checked_at: Set(None),
        last_response_time_ms: Set(None),
        next_check_at: Set(None),
        lease_expires_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert endpoint")
}

/// Inserts a log row directly, bypassing the recorder.
pub(crate) async fn insert_log(
    db: &DatabaseConnection,
    endpoint_id: i32,
    checked_at: DateTime<Utc>,
    success: bool,
    response_time_ms: i32,
) -> check_log::Model {
    check_log::ActiveModel {
        endpoint_id: Set(endpoint_id),
        checked_at: Set(checked_at),
        success: Set(success),
        status_code: Set(Some(if success { 200 } else { 500 })),
        response_time_ms: Set(response_time_ms),
        error_type: Set(None),
        error_message: Set(None),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert check log")
}

/// Makes the check-result update of the given endpoint fail, simulating a
/// crash in the middle of the recorder's write. Lease claims still succeed.
pub(crate) async fn fail_updates_of_endpoint(db: &DatabaseConnection, endpoint_id: i32) {
    db.execute_unprepared(&format!(
        "CREATE TRIGGER fail_endpoint_{endpoint_id} BEFORE UPDATE ON endpoints \
         WHEN OLD.id = {endpoint_id} AND NEW.last_checked_at IS NOT OLD.last_checked_at \
         BEGIN SELECT RAISE(ABORT, 'simulated write failure'); END;"
    ))
    .await
    .expect("create failure trigger");
}

/// Makes every notification insert fail.
pub(crate) async fn fail_notification_inserts(db: &DatabaseConnection) {
    db.execute_unprepared(
        "CREATE TRIGGER fail_notifications BEFORE INSERT ON notifications \
         BEGIN SELECT RAISE(ABORT, 'simulated notification failure'); END;",
    )
    .await
    .expect("create notification trigger");
}

/// An unsaved endpoint model for code paths that never touch the database.
pub(crate) fn endpoint_model(url: &str, timeout_ms: i32) -> endpoint::Model {
    let now = Utc::now();
    endpoint::Model {
        id: 1,
        owner_id: "owner-1".to_string(),
        name: "probe target".to_string(),
        url: url.to_string(),
        check_interval_ms: 60_000,
        timeout_ms,
        headers: None,
        status: None,
        last_checked_at: None,
        last_response_time_ms: None,
        next_check_at: None,
        lease_expires_at: None,
        created_at: now,
        updated_at: now,
    }
}
