//! Subscription types

use crate::error::{Error, Result};
use crate::handlers::ProviderContext;
use crate::http::{Request, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Events requested or live for one object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectEvents {
    pub events: Vec<String>,
}

impl ObjectEvents {
    pub fn new<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            events: events.into_iter().map(Into::into).collect(),
        }
    }
}

/// Parameters of a Subscribe call
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeParams {
    /// URL the provider delivers events to
    pub webhook_endpoint: String,
    /// Secret the provider signs deliveries with
    #[serde(default)]
    pub secret: String,
    /// Logical events per object (`tasks` → `["update"]`)
    pub subscription_events: BTreeMap<String, ObjectEvents>,
}

impl SubscribeParams {
    pub fn new(webhook_endpoint: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            webhook_endpoint: webhook_endpoint.into(),
            secret: secret.into(),
            subscription_events: BTreeMap::new(),
        }
    }

    /// Subscribe an object to logical events
    #[must_use]
    pub fn object<I, S>(mut self, object: impl Into<String>, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subscription_events
            .insert(object.into(), ObjectEvents::new(events));
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.webhook_endpoint.is_empty() {
            return Err(Error::config("webhook endpoint is required"));
        }
        if self.subscription_events.values().all(|e| e.events.is_empty()) {
            return Err(Error::MissingObjects);
        }
        Ok(())
    }
}

/// Terminal state of a Subscribe call
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SubscriptionStatus {
    /// Every requested event has a live subscription
    #[default]
    Success,
    /// A create failed and every created subscription was removed
    Failed,
    /// A create failed and some created subscriptions are still live
    FailedToRollback,
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::FailedToRollback => write!(f, "failed to roll back"),
        }
    }
}

/// One provider-native subscription
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRegistration {
    /// Provider subscription id
    pub id: String,
    /// Object the subscription belongs to
    pub object: String,
    /// Provider-native event type
    pub event_type: String,
    pub callback_url: String,
    #[serde(default)]
    pub enabled: bool,
    /// Remaining provider fields
    #[serde(default)]
    pub extra: Map<String, Value>,
}

/// Outcome of a Subscribe call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionResult {
    pub status: SubscriptionStatus,
    /// Provider events with a live subscription, per object
    pub object_events: BTreeMap<String, ObjectEvents>,
    /// Live subscriptions
    pub subscriptions: Vec<WebhookRegistration>,
}

impl SubscriptionResult {
    /// Result describing the given live subscriptions
    pub fn new(status: SubscriptionStatus, subscriptions: Vec<WebhookRegistration>) -> Self {
        let mut object_events: BTreeMap<String, ObjectEvents> = BTreeMap::new();
        for sub in &subscriptions {
            let events = &mut object_events.entry(sub.object.clone()).or_default().events;
            if !events.contains(&sub.event_type) {
                events.push(sub.event_type.clone());
            }
        }
        for events in object_events.values_mut() {
            events.events.sort();
        }
        Self {
            status,
            object_events,
            subscriptions,
        }
    }
}

// ============================================================================
// Provider Support
// ============================================================================

/// One provider-native event to subscribe
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventTarget {
    pub object: String,
    pub event: String,
}

/// `(object, logical event, provider events)`
pub type EventMapping = (&'static str, &'static str, &'static [&'static str]);

/// Builds the create request for one target
pub type BuildCreate = fn(&ProviderContext, &SubscribeParams, &EventTarget) -> Result<Request>;

/// Parses the create response for one target
pub type ParseCreate = fn(&ProviderContext, &EventTarget, &Response) -> Result<WebhookRegistration>;

/// Builds the delete request for a live subscription
pub type BuildDelete = fn(&ProviderContext, &WebhookRegistration) -> Result<Request>;

/// Webhook support of a provider
#[derive(Clone)]
pub struct SubscriptionSpec {
    /// Supported event matrix
    pub events: &'static [EventMapping],
    pub build_create: BuildCreate,
    pub parse_create: ParseCreate,
    pub build_delete: BuildDelete,
    /// Header carrying the hex HMAC-SHA1 of the body
    pub signature_header: &'static str,
    /// Concurrent create calls
    pub max_concurrency: usize,
}

impl SubscriptionSpec {
    /// Provider events for a logical event, if supported
    pub fn provider_events(&self, object: &str, event: &str) -> Option<&'static [&'static str]> {
        self.events
            .iter()
            .find(|(o, e, _)| *o == object && *e == event)
            .map(|(_, _, native)| *native)
    }

    /// Check every requested event and expand to provider events
    pub fn expand(&self, params: &SubscribeParams) -> Result<Vec<EventTarget>> {
        let mut targets: Vec<EventTarget> = Vec::new();
        for (object, requested) in &params.subscription_events {
            for event in &requested.events {
                let native = self.provider_events(object, event).ok_or_else(|| {
                    Error::InvalidSubscriptionEvent {
                        object: object.clone(),
                        event: event.clone(),
                    }
                })?;
                for native_event in native {
                    let target = EventTarget {
                        object: object.clone(),
                        event: (*native_event).to_string(),
                    };
                    if !targets.contains(&target) {
                        targets.push(target);
                    }
                }
            }
        }
        Ok(targets)
    }
}

impl std::fmt::Debug for SubscriptionSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionSpec")
            .field("events", &self.events)
            .field("signature_header", &self.signature_header)
            .field("max_concurrency", &self.max_concurrency)
            .finish_non_exhaustive()
    }
}
