//! Read side of the check log. Rows are only ever written by
//! [`crate::monitoring::recorder`].

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, FromQueryResult, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect,
};

use crate::db::entities::{check_log, prelude::*};

/// Totals for one outcome (success or failure) over a window.
#[derive(FromQueryResult, Debug, Clone, PartialEq, Eq)]
pub struct OutcomeBucket {
    pub success: bool,
    pub checks: i64,
    pub response_time_sum: Option<i64>,
}

/// Counts and response-time sums of an endpoint's logs with
/// `since <= checked_at <= until`, grouped by outcome. At most two rows.
pub async fn get_outcome_buckets(
    db: &DatabaseConnection,
    endpoint_id: i32,
    since: DateTime<Utc>,
    until: DateTime<Utc>,
) -> Result<Vec<OutcomeBucket>, DbErr> {
    CheckLog::find()
        .select_only()
        .column(check_log::Column::Success)
        .column_as(Expr::expr(Func::count(Expr::col(check_log::Column::Id))), "checks")
        .column_as(
            Expr::expr(Func::sum(Expr::col(check_log::Column::ResponseTimeMs))),
            "response_time_sum",
        )
        .filter(check_log::Column::EndpointId.eq(endpoint_id))
        .filter(check_log::Column::CheckedAt.gte(since))
        .filter(check_log::Column::CheckedAt.lte(until))
        .group_by(check_log::Column::Success)
        .into_model::<OutcomeBucket>()
        .all(db)
        .await
}

/// The newest `limit` log rows of an endpoint, newest first.
pub async fn get_recent_logs(
    db: &DatabaseConnection,
    endpoint_id: i32,
    limit: u64,
) -> Result<Vec<check_log::Model>, DbErr> {
    CheckLog::find()
        .filter(check_log::Column::EndpointId.eq(endpoint_id))
        .order_by_desc(check_log::Column::CheckedAt)
        .order_by_desc(check_log::Column::Id)
        .limit(limit)
        .all(db)
        .await
}

/// Recent logs for several endpoints, fetched concurrently. The output is
/// aligned with `endpoint_ids`.
pub async fn get_recent_logs_for_endpoints(
    db: &DatabaseConnection,
    endpoint_ids: &[i32],
    limit: u64,
) -> Result<Vec<Vec<check_log::Model>>, DbErr> {
    try_join_all(
        endpoint_ids
            .iter()
            .map(|endpoint_id| get_recent_logs(db, *endpoint_id, limit)),
    )
    .await
}

pub async fn count_logs(db: &DatabaseConnection, endpoint_id: i32) -> Result<u64, DbErr> {
    CheckLog::find()
        .filter(check_log::Column::EndpointId.eq(endpoint_id))
        .count(db)
        .await
}
