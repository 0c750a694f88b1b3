//! Executes one HTTP check against one endpoint.
//!
//! A probe never fails: transport problems are classified into a
//! [`CheckErrorType`] and returned inside the [`ProbeOutcome`], so the caller
//! can record them like any other result.

use std::error::Error as StdError;
use std::io;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Serialize;
use tracing::{debug, warn};

use crate::db::entities::endpoint;
use crate::db::enums::CheckErrorType;

const USER_AGENT: &str = concat!("uptime-monitor/", env!("CARGO_PKG_VERSION"));

/// Fragments that hyper, getaddrinfo and the Windows resolver use when a
/// host name cannot be resolved.
const DNS_FAILURE_MARKERS: &[&str] = &[
    "dns error",
    "failed to lookup address",
    "name or service not known",
    "nodename nor servname",
    "temporary failure in name resolution",
    "no such host",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProbeOutcome {
    /// `true` only for a 2xx response.
    pub success: bool,
    /// Present whenever a response was received, including non-2xx ones.
    pub status_code: Option<u16>,
    pub response_time_ms: i32,
    /// Only set when no response could be obtained.
    pub error_type: Option<CheckErrorType>,
    pub error_message: Option<String>,
}

impl ProbeOutcome {
    pub fn responded(status_code: u16, response_time_ms: i32) -> Self {
        Self {
            success: (200..300).contains(&status_code),
            status_code: Some(status_code),
            response_time_ms: response_time_ms.max(0),
            error_type: None,
            error_message: None,
        }
    }

    pub fn failed(error_type: CheckErrorType, message: String, response_time_ms: i32) -> Self {
        Self {
            success: false,
            status_code: None,
            response_time_ms: response_time_ms.max(0),
            error_type: Some(error_type),
            error_message: Some(message),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HealthProbe {
    client: Client,
}

impl HealthProbe {
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Sends a single GET to the endpoint's url, bounded by its `timeout_ms`.
    pub async fn probe(&self, endpoint: &endpoint::Model) -> ProbeOutcome {
        let timeout = Duration::from_millis(endpoint.timeout_ms.max(1) as u64);
        let request = self
            .client
            .get(endpoint.url.as_str())
            .timeout(timeout)
            .headers(custom_headers(endpoint));

        let started = Instant::now();
        let result = request.send().await;
        let response_time_ms = elapsed_ms(started);

        match result {
            Ok(response) => {
                let status = response.status();
                debug!(
                    endpoint_id = endpoint.id,
                    status = status.as_u16(),
                    response_time_ms,
                    "Probe received a response."
                );
                ProbeOutcome::responded(status.as_u16(), response_time_ms)
            }
            Err(e) => {
                let error_type = classify_error(&e);
                let message = error_chain(&e);
                debug!(
                    endpoint_id = endpoint.id,
                    error_type = %error_type,
                    error = %message,
                    response_time_ms,
                    "Probe failed to obtain a response."
                );
                ProbeOutcome::failed(error_type, message, response_time_ms)
            }
        }
    }
}

fn elapsed_ms(started: Instant) -> i32 {
    i32::try_from(started.elapsed().as_millis()).unwrap_or(i32::MAX)
}

/// Builds the request headers from the endpoint's JSON object. Entries that
/// are not valid HTTP header names or values are skipped.
fn custom_headers(endpoint: &endpoint::Model) -> HeaderMap {
    let mut headers = HeaderMap::new();
    let Some(object) = endpoint.headers.as_ref().and_then(|h| h.as_object()) else {
        return headers;
    };

    for (name, value) in object {
        let value = match value.as_str() {
            Some(s) => s.to_string(),
            None => value.to_string(),
        };
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => warn!(endpoint_id = endpoint.id, header = %name, "Skipping invalid custom header."),
        }
    }
    headers
}

fn sources<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    std::iter::successors(Some(err), |&e| e.source())
}

fn is_dns_failure(err: &(dyn StdError + 'static)) -> bool {
    sources(err).any(|e| {
        let text = e.to_string().to_ascii_lowercase();
        DNS_FAILURE_MARKERS.iter().any(|marker| text.contains(marker))
    })
}

fn is_connection_failure(err: &(dyn StdError + 'static)) -> bool {
    sources(err).any(|e| {
        if let Some(io_err) = e.downcast_ref::<io::Error>() {
            return matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::NotConnected
                    | io::ErrorKind::BrokenPipe
            );
        }
        e.to_string()
            .to_ascii_lowercase()
            .contains("connection closed before message completed")
    })
}

/// Maps a transport error onto the stored error taxonomy.
pub fn classify_error(err: &reqwest::Error) -> CheckErrorType {
    if err.is_timeout() {
        return CheckErrorType::Timeout;
    }
    // DNS failures surface as connect errors too, so they are checked first.
    if is_dns_failure(err) {
        return CheckErrorType::Dns;
    }
    if err.is_connect() || is_connection_failure(err) {
        return CheckErrorType::Connection;
    }
    if err.is_status() {
        return CheckErrorType::HttpStatus;
    }
    CheckErrorType::Unknown
}

/// The error and all of its sources, joined with `": "`.
pub fn error_chain(err: &reqwest::Error) -> String {
    let mut parts: Vec<String> = Vec::new();
    for e in sources(err) {
        let text = e.to_string();
        if !parts.iter().any(|p| p.contains(&text)) {
            parts.push(text);
        }
    }
    parts.join(": ")
}
