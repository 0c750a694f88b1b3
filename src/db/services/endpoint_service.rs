//! Queries over the `endpoints` table: owner-scoped CRUD plus the due
//! selection and lease claim used by the scheduler.

use chrono::{DateTime, SubsecRound, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set,
};
use std::collections::HashMap;
use tracing::debug;

use crate::db::entities::{endpoint, prelude::*};
use crate::web::models::endpoint_models::{
    CreateEndpoint, UpdateEndpoint, DEFAULT_CHECK_INTERVAL_MS, DEFAULT_TIMEOUT_MS,
};

fn headers_to_json(headers: HashMap<String, String>) -> Option<serde_json::Value> {
    if headers.is_empty() {
        None
    } else {
        serde_json::to_value(headers).ok()
    }
}

fn lease_free(now: DateTime<Utc>) -> Condition {
    Condition::any()
        .add(endpoint::Column::LeaseExpiresAt.is_null())
        .add(endpoint::Column::LeaseExpiresAt.lte(now))
}

pub async fn create_endpoint(
    db: &DatabaseConnection,
    owner_id: &str,
    data: CreateEndpoint,
) -> Result<endpoint::Model, DbErr> {
    let now = Utc::now();
    let new_endpoint = endpoint::ActiveModel {
        owner_id: Set(owner_id.to_string()),
        name: Set(data.name),
        url: Set(data.url),
        check_interval_ms: Set(data.check_interval_ms.unwrap_or(DEFAULT_CHECK_INTERVAL_MS)),
        timeout_ms: Set(data.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS)),
        headers: Set(data.headers.and_then(headers_to_json)),
        status: Set(None),
        last_checked_at: Set(None),
        last_response_time_ms: Set(None),
        next_check_at: Set(None),
        lease_expires_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    new_endpoint.insert(db).await
}

pub async fn get_endpoints_for_owner(
    db: &DatabaseConnection,
    owner_id: &str,
) -> Result<Vec<endpoint::Model>, DbErr> {
    Endpoint::find()
        .filter(endpoint::Column::OwnerId.eq(owner_id))
        .order_by_asc(endpoint::Column::Id)
        .all(db)
        .await
}

pub async fn get_endpoint_for_owner(
    db: &DatabaseConnection,
    endpoint_id: i32,
    owner_id: &str,
) -> Result<Option<endpoint::Model>, DbErr> {
    Endpoint::find_by_id(endpoint_id)
        .filter(endpoint::Column::OwnerId.eq(owner_id))
        .one(db)
        .await
}

pub async fn get_endpoint_by_id(
    db: &DatabaseConnection,
    endpoint_id: i32,
) -> Result<Option<endpoint::Model>, DbErr> {
    Endpoint::find_by_id(endpoint_id).one(db).await
}

pub async fn update_endpoint(
    db: &DatabaseConnection,
    endpoint_id: i32,
    owner_id: &str,
    payload: UpdateEndpoint,
) -> Result<endpoint::Model, DbErr> {
    let existing = get_endpoint_for_owner(db, endpoint_id, owner_id)
        .await?
        .ok_or_else(|| {
            DbErr::RecordNotFound("Endpoint not found or permission denied".to_string())
        })?;

    let last_checked_at = existing.last_checked_at;
    let mut active_endpoint: endpoint::ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active_endpoint.name = Set(name);
    }
    if let Some(url) = payload.url {
        active_endpoint.url = Set(url);
    }
    if let Some(interval) = payload.check_interval_ms {
        active_endpoint.check_interval_ms = Set(interval);
        if let Some(last) = last_checked_at {
            active_endpoint.next_check_at =
                Set(Some(last + chrono::Duration::milliseconds(interval)));
        }
    }
    if let Some(timeout) = payload.timeout_ms {
        active_endpoint.timeout_ms = Set(timeout);
    }
    if let Some(headers) = payload.headers {
        active_endpoint.headers = Set(headers_to_json(headers));
    }
    active_endpoint.updated_at = Set(Utc::now());

    active_endpoint.update(db).await
}

pub async fn delete_endpoint(
    db: &DatabaseConnection,
    endpoint_id: i32,
    owner_id: &str,
) -> Result<u64, DbErr> {
    let result = Endpoint::delete_many()
        .filter(endpoint::Column::Id.eq(endpoint_id))
        .filter(endpoint::Column::OwnerId.eq(owner_id))
        .exec(db)
        .await?;
    Ok(result.rows_affected)
}

/// Endpoints that should be probed at `now`: not leased, and either never
/// checked or with `next_check_at` already passed. Oldest checks first.
pub async fn find_due_endpoints(
    db: &DatabaseConnection,
    now: DateTime<Utc>,
) -> Result<Vec<endpoint::Model>, DbErr> {
    let due = Endpoint::find()
        .filter(lease_free(now))
        .filter(
            Condition::any()
                .add(endpoint::Column::NextCheckAt.is_null())
                .add(endpoint::Column::NextCheckAt.lte(now)),
        )
        .order_by_asc(endpoint::Column::NextCheckAt)
        .order_by_asc(endpoint::Column::Id)
        .all(db)
        .await?;
    debug!(count = due.len(), "Selected due endpoints.");
    Ok(due)
}

/// Claims the check lease for one endpoint.
///
/// The update only matches while the lease is free, so of several
/// concurrent claimers exactly one gets a token. The token is the stored
/// expiry and identifies the holder: later writes that carry it only apply
/// while the lease is still theirs.
pub async fn claim_endpoint(
    db: &DatabaseConnection,
    endpoint_id: i32,
    now: DateTime<Utc>,
    lease_until: DateTime<Utc>,
) -> Result<Option<DateTime<Utc>>, DbErr> {
    let token = lease_until.trunc_subsecs(3);
    let result = Endpoint::update_many()
        .col_expr(endpoint::Column::LeaseExpiresAt, Expr::value(token))
        .filter(endpoint::Column::Id.eq(endpoint_id))
        .filter(lease_free(now))
        .exec(db)
        .await?;
    Ok((result.rows_affected == 1).then_some(token))
}

/// Gives up a lease without recording a check. A no-op once the lease has
/// passed to another holder.
pub async fn release_lease(
    db: &DatabaseConnection,
    endpoint_id: i32,
    lease: DateTime<Utc>,
) -> Result<bool, DbErr> {
    let result = Endpoint::update_many()
        .col_expr(
            endpoint::Column::LeaseExpiresAt,
            Expr::value(Option::<DateTime<Utc>>::None),
        )
        .filter(endpoint::Column::Id.eq(endpoint_id))
        .filter(endpoint::Column::LeaseExpiresAt.eq(lease))
        .exec(db)
        .await?;
    Ok(result.rows_affected == 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::{insert_endpoint, memory_db};
    use chrono::Duration;

    #[tokio::test]
    async fn due_selection_respects_interval_and_lease() {
        let db = memory_db().await;
        let now = Utc::now();

        let never_checked = insert_endpoint(&db, "owner-1", "http://never.test").await;
        let stale = insert_endpoint(&db, "owner-1", "http://stale.test").await;
        let fresh = insert_endpoint(&db, "owner-1", "http://fresh.test").await;
        let leased = insert_endpoint(&db, "owner-1", "http://leased.test").await;

        let mut stale_am: endpoint::ActiveModel = stale.clone().into();
        stale_am.last_checked_at = Set(Some(now - Duration::minutes(2)));
        stale_am.next_check_at = Set(Some(now - Duration::minutes(1)));
        stale_am.update(&db).await.unwrap();

        let mut fresh_am: endpoint::ActiveModel = fresh.clone().into();
        fresh_am.last_checked_at = Set(Some(now - Duration::seconds(10)));
        fresh_am.next_check_at = Set(Some(now + Duration::seconds(50)));
        fresh_am.update(&db).await.unwrap();

        let mut leased_am: endpoint::ActiveModel = leased.clone().into();
        leased_am.lease_expires_at = Set(Some(now + Duration::seconds(30)));
        leased_am.update(&db).await.unwrap();

        let due: Vec<i32> = find_due_endpoints(&db, now)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();

        assert!(due.contains(&never_checked.id));
        assert!(due.contains(&stale.id));
        assert!(!due.contains(&fresh.id));
        assert!(!due.contains(&leased.id));
    }

    #[tokio::test]
    async fn only_one_claim_wins_until_the_lease_expires() {
        let db = memory_db().await;
        let endpoint = insert_endpoint(&db, "owner-1", "http://claim.test").await;
        let now = Utc::now();
        let until = now + Duration::seconds(35);

        assert!(claim_endpoint(&db, endpoint.id, now, until).await.unwrap().is_some());
        assert!(claim_endpoint(&db, endpoint.id, now, until).await.unwrap().is_none());

        // Once the lease has passed the endpoint can be claimed again.
        let later = until + Duration::seconds(1);
        assert!(claim_endpoint(&db, endpoint.id, later, later + Duration::seconds(35))
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn expired_holder_cannot_release_the_next_lease() {
        let db = memory_db().await;
        let endpoint = insert_endpoint(&db, "owner-1", "http://handover.test").await;
        let now = Utc::now();

        let stale = claim_endpoint(&db, endpoint.id, now - Duration::seconds(120), now - Duration::seconds(85))
            .await
            .unwrap()
            .unwrap();
        let current = claim_endpoint(&db, endpoint.id, now, now + Duration::seconds(35))
            .await
            .unwrap()
            .unwrap();

        assert!(!release_lease(&db, endpoint.id, stale).await.unwrap());
        assert!(claim_endpoint(&db, endpoint.id, now, now + Duration::seconds(35))
            .await
            .unwrap()
            .is_none());

        assert!(release_lease(&db, endpoint.id, current).await.unwrap());
        let stored = get_endpoint_by_id(&db, endpoint.id).await.unwrap().unwrap();
        assert_eq!(stored.lease_expires_at, None);
    }

    #[tokio::test]
    async fn interval_change_moves_the_next_check() {
        let db = memory_db().await;
        let endpoint = insert_endpoint(&db, "owner-1", "http://retimed.test").await;
        let checked_at = Utc::now() - Duration::minutes(3);
        let mut am: endpoint::ActiveModel = endpoint.clone().into();
        am.last_checked_at = Set(Some(checked_at));
        am.next_check_at = Set(Some(checked_at + Duration::minutes(1)));
        am.update(&db).await.unwrap();

        let update = UpdateEndpoint {
            check_interval_ms: Some(600_000),
            ..Default::default()
        };
        let updated = update_endpoint(&db, endpoint.id, "owner-1", update).await.unwrap();

        assert_eq!(updated.next_check_at, Some(checked_at + Duration::minutes(10)));
        assert!(find_due_endpoints(&db, Utc::now()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn owner_scoping_applies_to_reads_updates_and_deletes() {
        let db = memory_db().await;
        let endpoint = insert_endpoint(&db, "owner-1", "http://owned.test").await;

        assert!(get_endpoint_for_owner(&db, endpoint.id, "owner-2")
            .await
            .unwrap()
            .is_none());

        let update = UpdateEndpoint {
            timeout_ms: Some(2_000),
            ..Default::default()
        };
        assert!(update_endpoint(&db, endpoint.id, "owner-2", update.clone())
            .await
            .is_err());
        let updated = update_endpoint(&db, endpoint.id, "owner-1", update).await.unwrap();
        assert_eq!(updated.timeout_ms, 2_000);
        assert_eq!(updated.url, "http://owned.test");

        assert_eq!(delete_endpoint(&db, endpoint.id, "owner-2").await.unwrap(), 0);
        assert_eq!(delete_endpoint(&db, endpoint.id, "owner-1").await.unwrap(), 1);
        assert!(get_endpoint_by_id(&db, endpoint.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn create_applies_defaults_and_stores_headers() {
        let db = memory_db().await;
        let mut headers = HashMap::new();
        headers.insert("X-Api-Key".to_string(), "secret".to_string());
        let created = create_endpoint(
            &db,
            "owner-9",
            CreateEndpoint {
                name: "billing".to_string(),
                url: "https://billing.test/health".to_string(),
                check_interval_ms: None,
                timeout_ms: None,
                headers: Some(headers),
            },
        )
        .await
        .unwrap();

        assert_eq!(created.check_interval_ms, DEFAULT_CHECK_INTERVAL_MS);
        assert_eq!(created.timeout_ms, DEFAULT_TIMEOUT_MS);
        assert_eq!(created.status, None);
        assert_eq!(
            created.headers,
            Some(serde_json::json!({ "X-Api-Key": "secret" }))
        );
        assert_eq!(get_endpoints_for_owner(&db, "owner-9").await.unwrap().len(), 1);
    }
}
