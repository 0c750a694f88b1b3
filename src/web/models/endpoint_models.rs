use std::collections::HashMap;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::db::entities::{check_log, endpoint};
use crate::db::enums::EndpointStatus;
use crate::monitoring::probe::ProbeOutcome;
use crate::monitoring::stats::EndpointStats;

pub const MIN_CHECK_INTERVAL_MS: i64 = 60_000;
pub const MAX_CHECK_INTERVAL_MS: i64 = 86_400_000;
pub const DEFAULT_CHECK_INTERVAL_MS: i64 = 60_000;
pub const MIN_TIMEOUT_MS: i32 = 1_000;
pub const MAX_TIMEOUT_MS: i32 = 30_000;
pub const DEFAULT_TIMEOUT_MS: i32 = 5_000;
const MAX_NAME_LEN: usize = 100;

// Model for registering a new endpoint
#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CreateEndpoint {
    pub name: String,
    pub url: String,
    pub check_interval_ms: Option<i64>,
    pub timeout_ms: Option<i32>,
    pub headers: Option<HashMap<String, String>>,
}

impl CreateEndpoint {
    pub fn validate(&self) -> Result<(), String> {
        validate_name(&self.name)?;
        validate_url(&self.url)?;
        if let Some(interval) = self.check_interval_ms {
            validate_interval(interval)?;
        }
        if let Some(timeout) = self.timeout_ms {
            validate_timeout(timeout)?;
        }
        Ok(())
    }
}

// Model for a partial update; absent fields stay as they are
#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEndpoint {
    pub name: Option<String>,
    pub url: Option<String>,
    pub check_interval_ms: Option<i64>,
    pub timeout_ms: Option<i32>,
    pub headers: Option<HashMap<String, String>>,
}

impl UpdateEndpoint {
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(url) = &self.url {
            validate_url(url)?;
        }
        if let Some(interval) = self.check_interval_ms {
            validate_interval(interval)?;
        }
        if let Some(timeout) = self.timeout_ms {
            validate_timeout(timeout)?;
        }
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if len == 0 || len > MAX_NAME_LEN {
        return Err(format!("name must be between 1 and {MAX_NAME_LEN} characters"));
    }
    Ok(())
}

fn validate_url(url: &str) -> Result<(), String> {
    let parsed = Url::parse(url).map_err(|e| format!("url is not valid: {e}"))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        other => Err(format!("url scheme must be http or https, got '{other}'")),
    }
}

fn validate_interval(interval_ms: i64) -> Result<(), String> {
    if !(MIN_CHECK_INTERVAL_MS..=MAX_CHECK_INTERVAL_MS).contains(&interval_ms) {
        return Err(format!(
            "checkIntervalMs must be between {MIN_CHECK_INTERVAL_MS} and {MAX_CHECK_INTERVAL_MS}"
        ));
    }
    Ok(())
}

fn validate_timeout(timeout_ms: i32) -> Result<(), String> {
    if !(MIN_TIMEOUT_MS..=MAX_TIMEOUT_MS).contains(&timeout_ms) {
        return Err(format!(
            "timeoutMs must be between {MIN_TIMEOUT_MS} and {MAX_TIMEOUT_MS}"
        ));
    }
    Ok(())
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct EndpointDetails {
    #[serde(flatten)]
    pub endpoint: endpoint::Model,
    pub recent_logs: Vec<check_log::Model>,
}

/// Result of an on-demand check.
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct CheckResponse {
    pub endpoint_id: i32,
    pub outcome: ProbeOutcome,
    pub previous_status: Option<EndpointStatus>,
    pub status: EndpointStatus,
    pub log: check_log::Model,
    pub notification_created: bool,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct StatsQuery {
    pub window: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    pub endpoint_id: i32,
    pub window_seconds: i64,
    pub from: String,
    pub to: String,
    #[serde(flatten)]
    pub stats: EndpointStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(url: &str) -> CreateEndpoint {
        CreateEndpoint {
            name: "api".to_string(),
            url: url.to_string(),
            check_interval_ms: None,
            timeout_ms: None,
            headers: None,
        }
    }

    #[test]
    fn accepts_defaults() {
        assert!(create("https://example.com/health").validate().is_ok());
    }

    #[test]
    fn rejects_bad_urls() {
        assert!(create("not a url").validate().is_err());
        assert!(create("ftp://example.com").validate().is_err());
    }

    #[test]
    fn enforces_interval_and_timeout_bounds() {
        let mut data = create("http://example.com");
        data.check_interval_ms = Some(59_999);
        assert!(data.validate().is_err());
        data.check_interval_ms = Some(86_400_000);
        assert!(data.validate().is_ok());

        data.timeout_ms = Some(999);
        assert!(data.validate().is_err());
        data.timeout_ms = Some(30_001);
        assert!(data.validate().is_err());
        data.timeout_ms = Some(30_000);
        assert!(data.validate().is_ok());
    }

    #[test]
    fn update_validates_only_present_fields() {
        assert!(UpdateEndpoint::default().validate().is_ok());
        let update = UpdateEndpoint {
            name: Some("   ".to_string()),
            ..Default::default()
        };
        assert!(update.validate().is_err());
    }
}
