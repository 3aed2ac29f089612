//! The notification interface used by the order engine.
//!
//! The engine calls a [`Notifier`] only after its transaction commits. Every
//! method returns immediately: push requests go onto the [`EventBus`] and
//! emails are sent from spawned tasks. Failures are logged, never returned.

use std::sync::Arc;

use ama_core::types::DbId;
use serde::Serialize;

use crate::bus::{EventBus, PlatformEvent, PushRequest, EVENT_PUSH_REQUESTED};
use crate::delivery::email::{render_bulk_email, render_order_email, EmailDelivery};

// ---------------------------------------------------------------------------
// Message types
// ---------------------------------------------------------------------------

/// A push notification for one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub order_id: Option<DbId>,
}

impl PushMessage {
    pub fn new(title: &str, body: String, order_id: DbId) -> Self {
        Self {
            title: title.to_string(),
            body,
            order_id: Some(order_id),
        }
    }
}

/// A person on either end of an email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Recipient {
    pub id: DbId,
    pub username: String,
    pub email: Option<String>,
}

/// Which order email to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderEmailKind {
    /// Takers assigned to a new order.
    Created,
    /// Takers of an order the maker edited.
    Updated,
    /// The maker of an order a taker edited.
    UpdatedByTaker,
    /// The accounter of an order that reached `completed`.
    CompletedForAccounter,
}

/// One line item as shown in an email.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmailItem {
    pub name: String,
    pub quantity: String,
    pub price: Option<String>,
    pub status: Option<String>,
}

/// The order content an email is rendered from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderEmail {
    pub id: DbId,
    pub title: Option<String>,
    pub status: String,
    pub city: Option<String>,
    pub items: Vec<EmailItem>,
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

/// Post-commit notification sink.
pub trait Notifier: Send + Sync {
    /// Push a notification to every device of `user_id`.
    fn notify(&self, user_id: DbId, message: PushMessage);

    /// Email each recipient that has an address about `order`.
    fn send_order_email(
        &self,
        kind: OrderEmailKind,
        order: &OrderEmail,
        recipients: &[Recipient],
        actor: &Recipient,
        changes: &[String],
    );

    /// Email one recipient a digest of several orders.
    fn send_bulk_email(&self, orders: &[OrderEmail], recipient: &Recipient, sender: &Recipient);
}

/// Production notifier: push via the event bus, email via SMTP when configured.
pub struct Dispatcher {
    bus: Arc<EventBus>,
    email: Option<Arc<EmailDelivery>>,
}

impl Dispatcher {
    pub fn new(bus: Arc<EventBus>, email: Option<EmailDelivery>) -> Self {
        Self {
            bus,
            email: email.map(Arc::new),
        }
    }

    fn spawn_emails(&self, messages: Vec<(String, String, String)>) {
        let Some(delivery) = self.email.clone() else {
            tracing::debug!(count = messages.len(), "SMTP not configured, skipping emails");
            return;
        };
        if messages.is_empty() {
            return;
        }
        tokio::spawn(async move {
            for (to, subject, body) in messages {
                if let Err(e) = delivery.send(&to, &subject, &body).await {
                    tracing::warn!(to = %to, error = %e, "Failed to send order email");
                }
            }
        });
    }
}

impl Notifier for Dispatcher {
    fn notify(&self, user_id: DbId, message: PushMessage) {
        let request = PushRequest {
            user_id,
            title: message.title,
            body: message.body,
            order_id: message.order_id,
        };
        let payload = match serde_json::to_value(&request) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to encode push request");
                return;
            }
        };
        let mut event = PlatformEvent::new(EVENT_PUSH_REQUESTED).with_payload(payload);
        if let Some(order_id) = request.order_id {
            event = event.with_source("order", order_id);
        }
        self.bus.publish(event);
    }

    fn send_order_email(
        &self,
        kind: OrderEmailKind,
        order: &OrderEmail,
        recipients: &[Recipient],
        actor: &Recipient,
        changes: &[String],
    ) {
        let messages = recipients
            .iter()
            .filter_map(|recipient| {
                let to = recipient.email.clone()?;
                let (subject, body) = render_order_email(kind, order, recipient, actor, changes);
                Some((to, subject, body))
            })
            .collect();
        self.spawn_emails(messages);
    }

    fn send_bulk_email(&self, orders: &[OrderEmail], recipient: &Recipient, sender: &Recipient) {
        let Some(to) = recipient.email.clone() else {
            return;
        };
        let (subject, body) = render_bulk_email(orders, recipient, sender);
        self.spawn_emails(vec![(to, subject, body)]);
    }
}
