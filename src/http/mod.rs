//! HTTP client module
//!
//! The façade every verb goes through. Handlers build a [`Request`]; the
//! [`HttpClient`] authenticates and sends it, and returns a [`Response`]
//! carrying the parsed JSON body or the provider's interpreted error.
//!
//! # Features
//!
//! - **Authentication**: Integration with auth module
//! - **Rate Limiting**: Opt-in token bucket rate limiter using governor
//! - **Error Interpretation**: Non-2xx bodies go through the provider's error handler

mod client;
mod rate_limit;
mod request;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use request::{Request, Response};
