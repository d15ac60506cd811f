//! Authentication module
//!
//! Supports: API Key, Basic, Bearer, OAuth2 client credentials and
//! Atlassian Connect JWT. OAuth2 authorization-code tokens are either passed
//! as a bearer token or carried by a caller-supplied transport.

mod authenticator;
pub mod jwt;
mod types;

pub use authenticator::Authenticator;
pub use jwt::{create_connect_jwt, create_query_string_hash};
pub use types::{AuthConfig, CachedToken, Location};

#[cfg(test)]
mod tests;
