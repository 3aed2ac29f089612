//! Repository for the `users` table.

use ama_core::roles::Role;
use ama_core::search::prefix_pattern;
use ama_core::types::DbId;
use sqlx::PgPool;

use crate::models::user::{
    CreateUser, RoleCount, User, UserContact, UserFilter, UserSummary, UserWithApprover,
};
use crate::repositories::OrderRepo;

/// Column list for `users` queries.
const COLUMNS: &str = "id, username, password_hash, role, is_approved, email, \
     approved_by, approved_at, created_at, updated_at";

/// Provides CRUD operations for users.
pub struct UserRepo;

impl UserRepo {
    /// Insert a user. Admins are approved on creation; every other role waits.
    pub async fn create(pool: &PgPool, input: &CreateUser) -> Result<User, sqlx::Error> {
        let query = format!(
            "INSERT INTO users (username, password_hash, role, is_approved, email) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(&input.username)
            .bind(&input.password_hash)
            .bind(input.role.as_str())
            .bind(input.role.is_auto_approved())
            .bind(&input.email)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_by_username(
        pool: &PgPool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE username = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Whether at least one admin account exists.
    pub async fn admin_exists(pool: &PgPool) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin')")
            .fetch_one(pool)
            .await
    }

    /// Admin listing with optional role, approval and username-prefix filters.
    pub async fn list(pool: &PgPool, filter: &UserFilter) -> Result<Vec<UserWithApprover>, sqlx::Error> {
        sqlx::query_as::<_, UserWithApprover>(
            "SELECT u.id, u.username, u.email, u.role, u.is_approved, u.approved_by, \
                    u.approved_at, a.username AS approver_username, u.created_at \
             FROM users u \
             LEFT JOIN users a ON a.id = u.approved_by \
             WHERE ($1::TEXT IS NULL OR u.role = $1) \
               AND ($2::BOOLEAN IS NULL OR u.is_approved = $2) \
               AND ($3::TEXT IS NULL OR u.username LIKE $3) \
             ORDER BY u.created_at DESC",
        )
        .bind(&filter.role)
        .bind(filter.is_approved)
        .bind(filter.search.as_deref().map(prefix_pattern))
        .fetch_all(pool)
        .await
    }

    /// Non-admin users awaiting approval, oldest first.
    pub async fn list_pending(pool: &PgPool) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users \
             WHERE is_approved = false AND role <> 'admin' \
             ORDER BY created_at ASC"
        );
        sqlx::query_as::<_, User>(&query).fetch_all(pool).await
    }

    /// Every user with the given role, for assignment pickers.
    pub async fn list_by_role(pool: &PgPool, role: Role) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, role FROM users WHERE role = $1 ORDER BY username",
        )
        .bind(role.as_str())
        .fetch_all(pool)
        .await
    }

    /// Summaries for a set of user ids.
    pub async fn summaries(pool: &PgPool, ids: &[DbId]) -> Result<Vec<UserSummary>, sqlx::Error> {
        sqlx::query_as::<_, UserSummary>(
            "SELECT id, username, role FROM users WHERE id = ANY($1)",
        )
        .bind(ids)
        .fetch_all(pool)
        .await
    }

    /// Contacts for a set of user ids.
    pub async fn contacts(
        conn: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
        ids: &[DbId],
    ) -> Result<Vec<UserContact>, sqlx::Error> {
        sqlx::query_as::<_, UserContact>(
            "SELECT id, username, email FROM users WHERE id = ANY($1) ORDER BY username",
        )
        .bind(ids)
        .fetch_all(conn)
        .await
    }

    /// The subset of `ids` that belong to users with `role`.
    pub async fn ids_with_role(
        conn: impl sqlx::Executor<'_, Database = sqlx::Postgres>,
        ids: &[DbId],
        role: Role,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar::<_, DbId>("SELECT id FROM users WHERE id = ANY($1) AND role = $2")
            .bind(ids)
            .bind(role.as_str())
            .fetch_all(conn)
            .await
    }

    /// Mark a user approved by `admin_id`. Returns `None` if the user does not exist.
    pub async fn approve(
        pool: &PgPool,
        id: DbId,
        admin_id: DbId,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "UPDATE users SET is_approved = true, approved_by = $2, approved_at = NOW() \
             WHERE id = $1 \
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(admin_id)
            .fetch_optional(pool)
            .await
    }

    /// Set or clear a user's email. Returns `None` if the user does not exist.
    pub async fn update_email(
        pool: &PgPool,
        id: DbId,
        email: Option<&str>,
    ) -> Result<Option<User>, sqlx::Error> {
        let query = format!("UPDATE users SET email = $2 WHERE id = $1 RETURNING {COLUMNS}");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .bind(email)
            .fetch_optional(pool)
            .await
    }

    // -----------------------------------------------------------------------
    // Dashboard counts
    // -----------------------------------------------------------------------

    pub async fn count_non_admin(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*)::BIGINT FROM users WHERE role <> 'admin'")
            .fetch_one(pool)
            .await
    }

    pub async fn count_pending(pool: &PgPool) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*)::BIGINT FROM users WHERE is_approved = false AND role <> 'admin'",
        )
        .fetch_one(pool)
        .await
    }

    pub async fn count_by_role(pool: &PgPool) -> Result<Vec<RoleCount>, sqlx::Error> {
        sqlx::query_as::<_, RoleCount>(
            "SELECT role, COUNT(*)::BIGINT AS count FROM users \
             WHERE role <> 'admin' GROUP BY role ORDER BY role",
        )
        .fetch_all(pool)
        .await
    }

    // -----------------------------------------------------------------------
    // Deletion
    // -----------------------------------------------------------------------

    /// Delete a user and everything that only makes sense with them, in one
    /// transaction.
    ///
    /// References that outlive the user (approvals, order history, accounter
    /// routing) are nulled. Orders the user made are deleted with their items,
    /// logs and assignments. Returns `false` if the user does not exist.
    pub async fn delete_cascade(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let exists = sqlx::query_scalar::<_, bool>("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if !exists {
            tx.rollback().await?;
            return Ok(false);
        }

        for statement in [
            "DELETE FROM order_assignments WHERE user_id = $1",
            "DELETE FROM push_subscriptions WHERE user_id = $1",
            "DELETE FROM notifications WHERE user_id = $1",
            "DELETE FROM activity_logs WHERE user_id = $1",
            "UPDATE users SET approved_by = NULL WHERE approved_by = $1",
            "UPDATE order_logs SET changed_by = NULL WHERE changed_by = $1",
            "UPDATE orders SET accounter_id = NULL WHERE accounter_id = $1",
        ] {
            sqlx::query(statement).bind(id).execute(&mut *tx).await?;
        }

        let made: Vec<DbId> = sqlx::query_scalar("SELECT id FROM orders WHERE maker_id = $1")
            .bind(id)
            .fetch_all(&mut *tx)
            .await?;
        if !made.is_empty() {
            OrderRepo::delete_children(&mut tx, &made).await?;
            sqlx::query("DELETE FROM orders WHERE id = ANY($1)")
                .bind(&made)
                .execute(&mut *tx)
                .await?;
        }

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        tracing::info!(user_id = id, orders_deleted = made.len(), "User deleted");
        Ok(true)
    }
}
