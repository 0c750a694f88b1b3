pub mod endpoint_models;
pub mod notification_models;

/// Owner resolved from the bearer token, passed to handlers as a request
/// extension.
#[derive(Debug, Clone)]
pub struct AuthenticatedOwner {
    pub owner_id: String,
}
