//! SeaORM entities for the monitoring tables.

pub mod check_log;
pub mod endpoint;
pub mod notification;

pub mod prelude {
    pub use super::endpoint::Entity as Endpoint;
    pub use super::endpoint::Model as EndpointModel;
    pub use super::endpoint::ActiveModel as EndpointActiveModel;
    pub use super::endpoint::Column as EndpointColumn;

    pub use super::check_log::Entity as CheckLog;
    pub use super::check_log::Model as CheckLogModel;
    pub use super::check_log::ActiveModel as CheckLogActiveModel;
    pub use super::check_log::Column as CheckLogColumn;

    pub use super::notification::Entity as Notification;
    pub use super::notification::Model as NotificationModel;
    pub use super::notification::ActiveModel as NotificationActiveModel;
    pub use super::notification::Column as NotificationColumn;
}
