use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Health of a monitored endpoint as decided by the status engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "endpoint_status_enum")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointStatus {
    #[sea_orm(string_value = "ACTIVE")]
    Active,
    #[sea_orm(string_value = "WARNING")]
    Warning,
    #[sea_orm(string_value = "DOWN")]
    Down,
}

impl EndpointStatus {
    /// Lower-case label used in human-readable notification messages.
    pub fn label(self) -> &'static str {
        match self {
            EndpointStatus::Active => "active",
            EndpointStatus::Warning => "warning",
            EndpointStatus::Down => "down",
        }
    }
}

impl fmt::Display for EndpointStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

/// Kind of user-facing alert raised when an endpoint changes status.
///
/// Kept separate from [`EndpointStatus`]; the mapping between the two lives in
/// [`NotificationType::for_status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "notification_type_enum")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    #[sea_orm(string_value = "DOWN")]
    Down,
    #[sea_orm(string_value = "SLOW_RESPONSE")]
    SlowResponse,
    #[sea_orm(string_value = "RECOVERED")]
    Recovered,
}

impl NotificationType {
    pub fn for_status(status: EndpointStatus) -> Self {
        match status {
            EndpointStatus::Down => NotificationType::Down,
            EndpointStatus::Warning => NotificationType::SlowResponse,
            EndpointStatus::Active => NotificationType::Recovered,
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}

/// Why a probe failed to obtain a usable response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Text", enum_name = "check_error_type_enum")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckErrorType {
    #[sea_orm(string_value = "TIMEOUT")]
    Timeout,
    #[sea_orm(string_value = "CONNECTION")]
    Connection,
    #[sea_orm(string_value = "DNS")]
    Dns,
    #[sea_orm(string_value = "HTTP_STATUS")]
    HttpStatus,
    #[sea_orm(string_value = "UNKNOWN")]
    Unknown,
}

impl fmt::Display for CheckErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_value())
    }
}
