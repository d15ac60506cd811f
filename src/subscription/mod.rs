//! Webhook subscription module
//!
//! Validates requested events against a provider's event matrix, expands
//! them to provider-native events, creates the subscriptions concurrently
//! with compensating rollback, and verifies signed deliveries.

mod engine;
mod types;
mod verify;

pub use engine::{delete_subscription, subscribe};
pub use types::{
    BuildCreate, BuildDelete, EventMapping, EventTarget, ObjectEvents, ParseCreate,
    SubscribeParams, SubscriptionResult, SubscriptionSpec, SubscriptionStatus,
    WebhookRegistration,
};
pub use verify::{sign, verify_signature};
