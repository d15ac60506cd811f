//! Webhook subscription lifecycle
//!
//! Creates run concurrently. After the first failure no further creates
//! start; those already in flight complete, and every create that succeeded
//! is then deleted again.

use super::types::{
    EventTarget, SubscribeParams, SubscriptionResult, SubscriptionSpec, SubscriptionStatus,
    WebhookRegistration,
};
use crate::error::{Error, Result};
use crate::handlers::ProviderContext;
use crate::http::HttpClient;
use crate::interpreter::ErrorHandler;
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, warn};

/// Subscribe to every requested event.
///
/// On failure the returned `SubscriptionFailed` error carries the result:
/// `Failed` when the rollback removed everything, `FailedToRollback` with
/// the residual subscriptions otherwise.
pub async fn subscribe(
    client: &HttpClient,
    ctx: &ProviderContext,
    spec: &SubscriptionSpec,
    errors: &ErrorHandler,
    params: &SubscribeParams,
) -> Result<SubscriptionResult> {
    params.validate()?;
    let targets = spec.expand(params)?;

    info!(
        "Creating {} {} webhook subscriptions",
        targets.len(),
        ctx.provider
    );

    let failed = AtomicBool::new(false);
    let outcomes: Vec<Option<Result<WebhookRegistration>>> = stream::iter(targets)
        .map(|target| {
            let failed = &failed;
            async move {
                if failed.load(Ordering::SeqCst) {
                    return None;
                }
                let outcome = create(client, ctx, spec, errors, params, &target).await;
                if outcome.is_err() {
                    failed.store(true, Ordering::SeqCst);
                }
                Some(outcome)
            }
        })
        .buffer_unordered(spec.max_concurrency.max(1))
        .collect()
        .await;

    let mut created = Vec::new();
    let mut first_error = None;
    for outcome in outcomes.into_iter().flatten() {
        match outcome {
            Ok(registration) => created.push(registration),
            Err(e) if first_error.is_none() => first_error = Some(e),
            Err(e) => warn!("Additional subscription failure: {}", e),
        }
    }

    let Some(error) = first_error else {
        info!("Created {} webhook subscriptions", created.len());
        return Ok(SubscriptionResult::new(SubscriptionStatus::Success, created));
    };

    info!(
        "Subscription failed ({}), rolling back {} created subscriptions",
        error,
        created.len()
    );
    let residual = rollback(client, ctx, spec, errors, created).await;
    let status = if residual.is_empty() {
        SubscriptionStatus::Failed
    } else {
        SubscriptionStatus::FailedToRollback
    };

    Err(Error::SubscriptionFailed {
        result: Box::new(SubscriptionResult::new(status, residual)),
        source: Box::new(error),
    })
}

async fn create(
    client: &HttpClient,
    ctx: &ProviderContext,
    spec: &SubscriptionSpec,
    errors: &ErrorHandler,
    params: &SubscribeParams,
    target: &EventTarget,
) -> Result<WebhookRegistration> {
    let request = (spec.build_create)(ctx, params, target)?;
    let response = client.execute_with(&request, errors).await?;
    (spec.parse_create)(ctx, target, &response)
}

/// Delete every registration concurrently; returns those still live
async fn rollback(
    client: &HttpClient,
    ctx: &ProviderContext,
    spec: &SubscriptionSpec,
    errors: &ErrorHandler,
    created: Vec<WebhookRegistration>,
) -> Vec<WebhookRegistration> {
    let deletes = created.into_iter().map(|registration| async move {
        match delete(client, ctx, spec, errors, &registration).await {
            Ok(()) => None,
            Err(e) => {
                warn!(
                    "Failed to roll back subscription {} ({}/{}): {}",
                    registration.id, registration.object, registration.event_type, e
                );
                Some(registration)
            }
        }
    });

    join_all(deletes).await.into_iter().flatten().collect()
}

async fn delete(
    client: &HttpClient,
    ctx: &ProviderContext,
    spec: &SubscriptionSpec,
    errors: &ErrorHandler,
    registration: &WebhookRegistration,
) -> Result<()> {
    let request = (spec.build_delete)(ctx, registration)?;
    client.execute_with(&request, errors).await?;
    Ok(())
}

/// Delete the subscriptions of a result, one at a time. Stops at the first
/// failure.
pub async fn delete_subscription(
    client: &HttpClient,
    ctx: &ProviderContext,
    spec: &SubscriptionSpec,
    errors: &ErrorHandler,
    result: &SubscriptionResult,
) -> Result<()> {
    for registration in &result.subscriptions {
        delete(client, ctx, spec, errors, registration)
            .await
            .map_err(|e| Error::DeleteSubscription {
                object: registration.object.clone(),
                event: registration.event_type.clone(),
                id: registration.id.clone(),
                source: Box::new(e),
            })?;
    }
    info!(
        "Deleted {} {} webhook subscriptions",
        result.subscriptions.len(),
        ctx.provider
    );
    Ok(())
}
