//! Storage of user-facing notifications and the owner operations on them.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::db::entities::{notification, prelude::*};
use crate::db::enums::NotificationType;

/// How many notifications the owner listing returns.
pub const NOTIFICATION_LIST_LIMIT: u64 = 50;

pub async fn create_notification<C: ConnectionTrait>(
    db: &C,
    owner_id: &str,
    endpoint_id: i32,
    notification_type: NotificationType,
    message: String,
) -> Result<notification::Model, DbErr> {
    notification::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        endpoint_id: Set(endpoint_id),
        notification_type: Set(notification_type),
        message: Set(message),
        read: Set(false),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// The owner's newest notifications, newest first.
pub async fn get_notifications_for_owner(
    db: &DatabaseConnection,
    owner_id: &str,
    limit: u64,
) -> Result<Vec<notification::Model>, DbErr> {
    Notification::find()
        .filter(notification::Column::OwnerId.eq(owner_id))
        .order_by_desc(notification::Column::CreatedAt)
        .order_by_desc(notification::Column::Id)
        .limit(limit)
        .all(db)
        .await
}

pub async fn get_notifications_for_endpoint(
    db: &DatabaseConnection,
    endpoint_id: i32,
) -> Result<Vec<notification::Model>, DbErr> {
    Notification::find()
        .filter(notification::Column::EndpointId.eq(endpoint_id))
        .order_by_asc(notification::Column::Id)
        .all(db)
        .await
}

/// Marks one of the owner's notifications as read. `None` when it does not
/// exist or belongs to someone else.
pub async fn mark_as_read(
    db: &DatabaseConnection,
    notification_id: i32,
    owner_id: &str,
) -> Result<Option<notification::Model>, DbErr> {
    let Some(existing) = Notification::find_by_id(notification_id)
        .filter(notification::Column::OwnerId.eq(owner_id))
        .one(db)
        .await?
    else {
        return Ok(None);
    };

    if existing.read {
        return Ok(Some(existing));
    }

    let mut active: notification::ActiveModel = existing.into();
    active.read = Set(true);
    active.update(db).await.map(Some)
}

/// Removes every notification of the owner that has been read.
pub async fn delete_read_notifications(
    db: &DatabaseConnection,
    owner_id: &str,
) -> Result<u64, DbErr> {
    let result = Notification::delete_many()
        .filter(notification::Column::OwnerId.eq(owner_id))
        .filter(notification::Column::Read.eq(true))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}
