//! Middleware for the Sharebox API.

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::security_headers;
