pub mod endpoint_routes;
pub mod notification_routes;
