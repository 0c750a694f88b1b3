//! One unit of work: claim, probe, classify, record, notify.

use chrono::{DateTime, Duration, Utc};
use sea_orm::DatabaseConnection;
use tracing::debug;

use crate::db::entities::{check_log, endpoint, notification};
use crate::db::services::endpoint_service;
use crate::monitoring::error::MonitorError;
use crate::monitoring::probe::{HealthProbe, ProbeOutcome};
use crate::monitoring::recorder;
use crate::monitoring::status_engine::{self, Transition};

#[derive(Debug, Clone)]
pub struct CheckReport {
    pub endpoint_id: i32,
    pub outcome: ProbeOutcome,
    pub transition: Transition,
    pub log: check_log::Model,
    /// The endpoint as committed by the recorder.
    pub endpoint: endpoint::Model,
    pub notification: Option<notification::Model>,
}

#[derive(Debug, Clone)]
pub struct CheckRunner {
    db: DatabaseConnection,
    probe: HealthProbe,
    lease_grace: Duration,
}

impl CheckRunner {
    pub fn new(db: DatabaseConnection, probe: HealthProbe, lease_grace: std::time::Duration) -> Self {
        let lease_grace = Duration::from_std(lease_grace).unwrap_or_else(|_| Duration::seconds(30));
        Self {
            db,
            probe,
            lease_grace,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    /// The lease outlives the probe's own deadline by the grace period, so it
    /// only expires once the holder has certainly given up.
    pub fn lease_until(&self, endpoint: &endpoint::Model, now: DateTime<Utc>) -> DateTime<Utc> {
        now + Duration::milliseconds(i64::from(endpoint.timeout_ms)) + self.lease_grace
    }

    /// Runs a scheduled check. Returns `Ok(None)` when another check holds the
    /// lease or the endpoint was checked since it was selected.
    pub async fn claim_and_run(
        &self,
        selected: &endpoint::Model,
    ) -> Result<Option<CheckReport>, MonitorError> {
        let now = Utc::now();
        let Some(lease) = self.claim(selected, now).await? else {
            debug!(endpoint_id = selected.id, "Endpoint lease is held elsewhere, skipping.");
            return Ok(None);
        };

        let current = self.reload(selected.id).await?;
        if !current.is_due(now) {
            debug!(endpoint_id = current.id, "Endpoint was checked since selection, skipping.");
            endpoint_service::release_lease(&self.db, current.id, lease).await?;
            return Ok(None);
        }

        self.run_claimed(&current, lease).await.map(Some)
    }

    /// Runs a check on demand, regardless of whether the endpoint is due.
    pub async fn check_now(&self, endpoint_id: i32) -> Result<CheckReport, MonitorError> {
        let selected = self.reload(endpoint_id).await?;
        let lease = self
            .claim(&selected, Utc::now())
            .await?
            .ok_or(MonitorError::LeaseHeld(endpoint_id))?;
        let current = self.reload(endpoint_id).await?;
        self.run_claimed(&current, lease).await
    }

    async fn claim(
        &self,
        endpoint: &endpoint::Model,
        now: DateTime<Utc>,
    ) -> Result<Option<DateTime<Utc>>, MonitorError> {
        let until = self.lease_until(endpoint, now);
        Ok(endpoint_service::claim_endpoint(&self.db, endpoint.id, now, until).await?)
    }

    async fn reload(&self, endpoint_id: i32) -> Result<endpoint::Model, MonitorError> {
        endpoint_service::get_endpoint_by_id(&self.db, endpoint_id)
            .await?
            .ok_or(MonitorError::EndpointNotFound(endpoint_id))
    }

    /// Steps run strictly in order. A failure leaves the lease in place to
    /// expire, after which the endpoint is due again.
    async fn run_claimed(
        &self,
        endpoint: &endpoint::Model,
        lease: DateTime<Utc>,
    ) -> Result<CheckReport, MonitorError> {
        let outcome = self.probe.probe(endpoint).await;
        let transition = status_engine::transition(endpoint.status, &outcome, endpoint.timeout_ms);
        let recorded = recorder::record(&self.db, endpoint, lease, &outcome, &transition).await?;

        Ok(CheckReport {
            endpoint_id: endpoint.id,
            outcome,
            transition,
            log: recorded.log,
            endpoint: recorded.endpoint,
            notification: recorded.notification,
        })
    }
}
