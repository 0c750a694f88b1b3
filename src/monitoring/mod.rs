//! The check pipeline.
//!
//! ```text
//! scheduler tick ─► find due endpoints ─► per endpoint, concurrently:
//!     claim lease ─► probe ─► status_engine ─► recorder ─► dispatcher
//! ```
//!
//! `stats` reads what the recorder writes and runs independently.

pub mod error;
pub mod probe;
pub mod recorder;
pub mod runner;
pub mod scheduler;
pub mod stats;
pub mod status_engine;

pub use error::MonitorError;
pub use probe::{HealthProbe, ProbeOutcome};
pub use runner::{CheckReport, CheckRunner};
pub use scheduler::{Scheduler, SchedulerConfig, TickSummary};
