//! Database access for the monitoring tables, one sub-module per entity.
//!
//! Functions take a `&DatabaseConnection` and return sea-orm models; the
//! monitoring engine and the HTTP handlers both go through these.

pub mod check_log_service;
pub mod endpoint_service;
pub mod notification_service;
