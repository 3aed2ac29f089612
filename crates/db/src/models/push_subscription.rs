//! Web push subscription models.

use ama_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `push_subscriptions` table.
#[derive(Debug, Clone, FromRow, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushSubscription {
    pub id: DbId,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_id: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Keys from a browser `PushSubscription.toJSON()`.
#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Body of `POST /notifications/subscribe`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePushSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}
