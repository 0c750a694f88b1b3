//! User-facing alerts raised when an endpoint changes status.

pub mod dispatcher;
