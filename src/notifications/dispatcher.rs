//! Turns a status transition into a stored notification.
//!
//! Deduplication happens upstream: the status engine decides at most once per
//! check whether a notification is due, and the dispatcher must be called at
//! most once per check.

use sea_orm::{ConnectionTrait, DbErr};
use tracing::info;

use crate::db::entities::{endpoint, notification};
use crate::db::enums::EndpointStatus;
use crate::db::services::notification_service;
use crate::monitoring::status_engine::Transition;

pub fn notification_message(endpoint_name: &str, status: EndpointStatus) -> String {
    format!("Endpoint {} is now {}", endpoint_name, status.label())
}

/// Inserts a notification for the endpoint's owner when the transition
/// calls for one. Returns `None` without touching the database otherwise.
///
/// The recorder calls this inside its check transaction, so a notification
/// exists exactly when the status change it reports was committed.
pub async fn maybe_notify<C: ConnectionTrait>(
    db: &C,
    endpoint: &endpoint::Model,
    transition: &Transition,
) -> Result<Option<notification::Model>, DbErr> {
    let Some(notification_type) = transition.notify else {
        return Ok(None);
    };

    let created = notification_service::create_notification(
        db,
        &endpoint.owner_id,
        endpoint.id,
        notification_type,
        notification_message(&endpoint.name, transition.new_status),
    )
    .await?;

    info!(
        endpoint_id = endpoint.id,
        notification_id = created.id,
        notification_type = %notification_type,
        previous = ?transition.previous,
        status = %transition.new_status,
        "Status transition notification written."
    );
    Ok(Some(created))
}
