//! Push subscription storage, keyed by user.

use sqlx::sqlite::SqlitePool;

/// A stored web-push subscription.
#[derive(Debug, Clone)]
pub struct PushSubscription {
    pub user_id: String,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Store for push subscriptions.
pub struct SubscriptionStore {
    pool: SqlitePool,
}

impl SubscriptionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save a user's subscription, replacing any previous one.
    pub async fn upsert(
        &self,
        user_id: &str,
        endpoint: &str,
        p256dh: &str,
        auth: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO push_subscriptions (user_id, endpoint, p256dh, auth) VALUES (?, ?, ?, ?)
             ON CONFLICT(user_id) DO UPDATE SET
                endpoint = excluded.endpoint,
                p256dh = excluded.p256dh,
                auth = excluded.auth,
                updated_at = datetime('now')",
        )
        .bind(user_id)
        .bind(endpoint)
        .bind(p256dh)
        .bind(auth)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Get a user's subscription.
    pub async fn get_by_user(&self, user_id: &str) -> Result<Option<PushSubscription>, sqlx::Error> {
        let row: Option<(String, String, String, String, String, String)> = sqlx::query_as(
            "SELECT user_id, endpoint, p256dh, auth, created_at, updated_at
             FROM push_subscriptions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(
            |(user_id, endpoint, p256dh, auth, created_at, updated_at)| PushSubscription {
                user_id,
                endpoint,
                p256dh,
                auth,
                created_at,
                updated_at,
            },
        ))
    }

    /// Delete a user's subscription.
    pub async fn delete_by_user(&self, user_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Number of stored subscriptions.
    pub async fn count(&self) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM push_subscriptions")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0)
    }
}
