use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::db::enums::EndpointStatus;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "endpoints")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub owner_id: String,
    pub name: String,
    pub url: String,
    pub check_interval_ms: i64,
    pub timeout_ms: i32,
    #[sea_orm(column_type = "Json", nullable)]
    pub headers: Option<Json>,
    pub status: Option<EndpointStatus>,
    pub last_checked_at: Option<ChronoDateTimeUtc>,
    pub last_response_time_ms: Option<i32>,
    /// `last_checked_at + check_interval_ms`; `None` until the first check.
    pub next_check_at: Option<ChronoDateTimeUtc>,
    /// Set while a check is in flight; the endpoint is not selectable until it passes.
    #[serde(skip)]
    pub lease_expires_at: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::check_log::Entity")]
    CheckLog,
    #[sea_orm(has_many = "super::notification::Entity")]
    Notification,
}

impl Related<super::check_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::CheckLog.def()
    }
}

impl Related<super::notification::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notification.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// An endpoint is due when it was never checked or its last check is at
    /// least one interval old.
    pub fn is_due(&self, now: ChronoDateTimeUtc) -> bool {
        self.next_check_at.map_or(true, |next| next <= now)
    }

    /// When the check after one at `checked_at` becomes due.
    pub fn next_check_after(&self, checked_at: ChronoDateTimeUtc) -> ChronoDateTimeUtc {
        checked_at + chrono::Duration::milliseconds(self.check_interval_ms)
    }

    pub fn is_leased(&self, now: ChronoDateTimeUtc) -> bool {
        self.lease_expires_at.is_some_and(|until| until > now)
    }
}
