//! Trailing-window statistics over the check log. Read-only.
//!
//! Counting and summing happen in the store; only the per-outcome totals
//! come back.

use chrono::{DateTime, Duration, Utc};
use sea_orm::{DatabaseConnection, DbErr};
use serde::Serialize;

use crate::db::services::check_log_service::{self, OutcomeBucket};

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStats {
    pub success_count: u64,
    pub failure_count: u64,
    /// Mean over every row in the window, successful or not.
    pub avg_response_time_ms: f64,
    pub uptime_percentage: f64,
}

/// Folds the per-outcome totals into statistics. No checks yield all zeros.
pub fn aggregate(buckets: &[OutcomeBucket]) -> EndpointStats {
    let mut success_count = 0u64;
    let mut failure_count = 0u64;
    let mut response_time_sum = 0i64;
    for bucket in buckets {
        let checks = u64::try_from(bucket.checks).unwrap_or(0);
        if bucket.success {
            success_count += checks;
        } else {
            failure_count += checks;
        }
        response_time_sum += bucket.response_time_sum.unwrap_or(0);
    }

    let total = success_count + failure_count;
    if total == 0 {
        return EndpointStats::default();
    }
    EndpointStats {
        success_count,
        failure_count,
        avg_response_time_ms: response_time_sum as f64 / total as f64,
        uptime_percentage: success_count as f64 * 100.0 / total as f64,
    }
}

/// Statistics for the rows in `[now - window, now]`.
pub async fn stats(
    db: &DatabaseConnection,
    endpoint_id: i32,
    window: Duration,
    now: DateTime<Utc>,
) -> Result<EndpointStats, DbErr> {
    let buckets = check_log_service::get_outcome_buckets(db, endpoint_id, now - window, now).await?;
    Ok(aggregate(&buckets))
}
