//! Persists check results: one immutable log row, the endpoint's
//! denormalized last-check fields and any status notification, written in a
//! single transaction.

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use tracing::{debug, error, warn};

use crate::db::entities::{check_log, endpoint, notification, prelude::*};
use crate::monitoring::error::MonitorError;
use crate::monitoring::probe::ProbeOutcome;
use crate::monitoring::status_engine::Transition;
use crate::notifications::dispatcher;

#[derive(Debug, Clone)]
pub struct RecordedCheck {
    pub log: check_log::Model,
    pub endpoint: endpoint::Model,
    pub notification: Option<notification::Model>,
}

/// Appends the check log, updates the endpoint and stores the transition's
/// notification. Either all writes are committed or none is.
///
/// `lease` is the token returned by the claim. If the lease has since
/// expired and been claimed by another check, nothing is written and
/// [`MonitorError::LeaseLost`] is returned. On success the lease is released.
pub async fn record(
    db: &DatabaseConnection,
    endpoint: &endpoint::Model,
    lease: DateTime<Utc>,
    outcome: &ProbeOutcome,
    transition: &Transition,
) -> Result<RecordedCheck, MonitorError> {
    let txn = db.begin().await?;
    match write_check(&txn, endpoint.id, lease, outcome, transition).await {
        Ok(recorded) => {
            txn.commit().await?;
            debug!(
                endpoint_id = endpoint.id,
                log_id = recorded.log.id,
                status = %transition.new_status,
                "Check recorded."
            );
            Ok(recorded)
        }
        Err(e) => {
            if let Err(rollback_err) = txn.rollback().await {
                error!(
                    endpoint_id = endpoint.id,
                    error = %rollback_err,
                    "Failed to roll back check transaction."
                );
            }
            Err(e)
        }
    }
}

async fn write_check(
    txn: &DatabaseTransaction,
    endpoint_id: i32,
    lease: DateTime<Utc>,
    outcome: &ProbeOutcome,
    transition: &Transition,
) -> Result<RecordedCheck, MonitorError> {
    // Re-read inside the transaction: the endpoint may have been edited or
    // deleted while the probe was in flight.
    let current = Endpoint::find_by_id(endpoint_id)
        .one(txn)
        .await?
        .ok_or(MonitorError::EndpointNotFound(endpoint_id))?;
    if current.lease_expires_at != Some(lease) {
        warn!(endpoint_id, "Check lease expired before the result was recorded.");
        return Err(MonitorError::LeaseLost(endpoint_id));
    }

    // lastCheckedAt never moves backwards.
    let checked_at = match current.last_checked_at {
        Some(last) if last > Utc::now() => last,
        _ => Utc::now(),
    };
    let response_time_ms = outcome.response_time_ms.max(0);

    let log = check_log::ActiveModel {
        endpoint_id: Set(endpoint_id),
        checked_at: Set(checked_at),
        success: Set(outcome.success),
        status_code: Set(outcome.status_code.map(i32::from)),
        response_time_ms: Set(response_time_ms),
        error_type: Set(outcome.error_type),
        error_message: Set(outcome.error_message.clone()),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    let next_check_at = current.next_check_after(checked_at);
    let changes = endpoint::ActiveModel {
        status: Set(Some(transition.new_status)),
        last_checked_at: Set(Some(checked_at)),
        last_response_time_ms: Set(Some(response_time_ms)),
        next_check_at: Set(Some(next_check_at)),
        lease_expires_at: Set(None),
        ..Default::default()
    };
    // The lease filter makes the update authoritative even if another claim
    // landed after the read above.
    let updated = Endpoint::update_many()
        .set(changes)
        .filter(endpoint::Column::Id.eq(endpoint_id))
        .filter(endpoint::Column::LeaseExpiresAt.eq(lease))
        .exec(txn)
        .await?;
    if updated.rows_affected != 1 {
        return Err(MonitorError::LeaseLost(endpoint_id));
    }

    let endpoint = endpoint::Model {
        status: Some(transition.new_status),
        last_checked_at: Some(checked_at),
        last_response_time_ms: Some(response_time_ms),
        next_check_at: Some(next_check_at),
        lease_expires_at: None,
        ..current
    };
    let notification = dispatcher::maybe_notify(txn, &endpoint, transition).await?;

    Ok(RecordedCheck {
        log,
        endpoint,
        notification,
    })
}
