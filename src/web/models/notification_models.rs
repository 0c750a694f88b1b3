use serde::Serialize;

use crate::db::entities::notification;

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct DeletedNotifications {
    pub deleted: u64,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct NotificationList {
    pub unread: usize,
    pub notifications: Vec<notification::Model>,
}
