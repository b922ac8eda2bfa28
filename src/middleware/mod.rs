//! HTTP middleware

mod auth;
mod rate_limiter;
mod security;
mod tracing;

pub use auth::BearerIdentity;
pub use rate_limiter::{rate_limit_layer, RateLimiter};
pub use security::security_headers;
pub use tracing::request_tracing;
