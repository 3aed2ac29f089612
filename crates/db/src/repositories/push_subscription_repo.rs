//! Repository for the `push_subscriptions` table.

use ama_core::types::DbId;
use sqlx::PgPool;

use crate::models::push_subscription::{CreatePushSubscription, PushSubscription};

const COLUMNS: &str = "id, endpoint, p256dh, auth, user_id, created_at, updated_at";

pub struct PushSubscriptionRepo;

impl PushSubscriptionRepo {
    /// Store a browser subscription. An endpoint that already exists is
    /// reassigned to `user_id` with the new keys.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        input: &CreatePushSubscription,
    ) -> Result<PushSubscription, sqlx::Error> {
        let query = format!(
            "INSERT INTO push_subscriptions (endpoint, p256dh, auth, user_id) \
             VALUES ($1, $2, $3, $4) \
             ON CONFLICT ON CONSTRAINT uq_push_subscriptions_endpoint DO UPDATE SET \
                p256dh = EXCLUDED.p256dh, auth = EXCLUDED.auth, user_id = EXCLUDED.user_id \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(&input.endpoint)
            .bind(&input.keys.p256dh)
            .bind(&input.keys.auth)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<PushSubscription>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM push_subscriptions WHERE user_id = $1 ORDER BY id");
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Drop a subscription the push service reported as gone.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
