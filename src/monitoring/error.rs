use sea_orm::DbErr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
    #[error("Endpoint {0} not found")]
    EndpointNotFound(i32),
    #[error("A check of endpoint {0} is already in progress")]
    LeaseHeld(i32),
    #[error("The check lease on endpoint {0} passed to another check")]
    LeaseLost(i32),
    #[error("Scheduler is shutting down")]
    SchedulerClosed,
}
