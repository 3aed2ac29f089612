//! Web push fan-out.
//!
//! [`PushFanout`] subscribes to the [`EventBus`](crate::bus::EventBus), picks
//! up push requests, and hands one payload per registered device to a
//! [`PushTransport`]. Subscriptions the push service reports as gone are
//! deleted.

use std::sync::Arc;

use ama_db::models::push_subscription::PushSubscription;
use ama_db::repositories::PushSubscriptionRepo;
use ama_db::DbPool;
use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::bus::{PlatformEvent, PushRequest, EVENT_PUSH_REQUESTED};

/// Where the client opens when a notification is clicked.
const NOTIFICATION_URL: &str = "/";

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    /// The endpoint no longer exists; the subscription should be dropped.
    #[error("Push subscription expired (HTTP {0})")]
    Gone(u16),

    #[error("Push delivery failed: {0}")]
    Transport(String),
}

impl PushError {
    /// Classify a push service response status.
    pub fn check_status(status: u16) -> Result<(), PushError> {
        match status {
            200..=299 => Ok(()),
            404 | 410 => Err(PushError::Gone(status)),
            other => Err(PushError::Transport(format!("push service returned HTTP {other}"))),
        }
    }
}

/// The JSON a service worker receives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub url: String,
}

impl From<&PushRequest> for PushPayload {
    fn from(request: &PushRequest) -> Self {
        Self {
            title: request.title.clone(),
            body: request.body.clone(),
            url: NOTIFICATION_URL.to_string(),
        }
    }
}

/// Sends one payload to one browser subscription.
#[async_trait]
pub trait PushTransport: Send + Sync {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), PushError>;
}

/// Transport that records deliveries in the log instead of contacting a push service.
pub struct LogPushTransport;

#[async_trait]
impl PushTransport for LogPushTransport {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &PushPayload,
    ) -> Result<(), PushError> {
        tracing::info!(
            user_id = subscription.user_id,
            subscription_id = subscription.id,
            title = %payload.title,
            "Push notification"
        );
        Ok(())
    }
}

/// Background service delivering push requests from the event bus.
pub struct PushFanout;

impl PushFanout {
    /// Run until the bus closes.
    pub async fn run(
        pool: DbPool,
        transport: Arc<dyn PushTransport>,
        mut receiver: broadcast::Receiver<PlatformEvent>,
    ) {
        loop {
            match receiver.recv().await {
                Ok(event) if event.event_type == EVENT_PUSH_REQUESTED => {
                    match serde_json::from_value::<PushRequest>(event.payload) {
                        Ok(request) => Self::deliver(&pool, transport.as_ref(), &request).await,
                        Err(e) => tracing::error!(error = %e, "Malformed push request"),
                    }
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Push fan-out lagged, some notifications were dropped");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, push fan-out shutting down");
                    break;
                }
            }
        }
    }

    async fn deliver(pool: &DbPool, transport: &dyn PushTransport, request: &PushRequest) {
        let subscriptions = match PushSubscriptionRepo::list_for_user(pool, request.user_id).await {
            Ok(subs) => subs,
            Err(e) => {
                tracing::error!(user_id = request.user_id, error = %e, "Failed to load push subscriptions");
                return;
            }
        };
        if subscriptions.is_empty() {
            tracing::debug!(user_id = request.user_id, "No push subscriptions");
            return;
        }

        let payload = PushPayload::from(request);
        for subscription in &subscriptions {
            match transport.send(subscription, &payload).await {
                Ok(()) => {}
                Err(PushError::Gone(status)) => {
                    tracing::info!(
                        subscription_id = subscription.id,
                        status,
                        "Removing expired push subscription"
                    );
                    if let Err(e) = PushSubscriptionRepo::delete(pool, subscription.id).await {
                        tracing::error!(subscription_id = subscription.id, error = %e, "Failed to delete push subscription");
                    }
                }
                Err(e) => {
                    tracing::warn!(subscription_id = subscription.id, error = %e, "Push delivery failed");
                }
            }
        }
    }
}
