use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;

use crate::domain::{NotificationPreferences, PushSubscription};

use super::repo_error::RepositoryError;

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn active_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, RepositoryError>;
    async fn active_for_users(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<PushSubscription>, RepositoryError>;
    async fn active_for_hospital(
        &self,
        hospital_id: &str,
        role: Option<&str>,
    ) -> Result<Vec<PushSubscription>, RepositoryError>;
    async fn touch_last_used(&self, id: i32, at: OffsetDateTime) -> Result<(), RepositoryError>;
    async fn deactivate(&self, id: i32) -> Result<(), RepositoryError>;
}

#[derive(FromRow)]
struct PushSubscriptionRow {
    id: i32,
    user_id: String,
    endpoint: String,
    p256dh: String,
    auth: String,
    preferences: Json<NotificationPreferences>,
    is_active: bool,
    last_used_at: Option<OffsetDateTime>,
    created_at: OffsetDateTime,
}

impl From<PushSubscriptionRow> for PushSubscription {
    fn from(row: PushSubscriptionRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            endpoint: row.endpoint,
            p256dh: row.p256dh,
            auth: row.auth,
            preferences: row.preferences.0,
            is_active: row.is_active,
            last_used_at: row.last_used_at,
            created_at: row.created_at,
        }
    }
}

pub struct SubscriptionRepositoryImpl {
    pool: PgPool,
}

impl SubscriptionRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for SubscriptionRepositoryImpl {
    async fn active_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, RepositoryError> {
        let rows = sqlx::query_as::<_, PushSubscriptionRow>(
            r#"
            SELECT id, user_id, endpoint, p256dh, auth, preferences,
                   is_active, last_used_at, created_at
            FROM push_subscriptions
            WHERE user_id = $1 AND is_active = TRUE
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PushSubscription::from).collect())
    }

    async fn active_for_users(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<PushSubscription>, RepositoryError> {
        let rows = sqlx::query_as::<_, PushSubscriptionRow>(
            r#"
            SELECT id, user_id, endpoint, p256dh, auth, preferences,
                   is_active, last_used_at, created_at
            FROM push_subscriptions
            WHERE user_id = ANY($1) AND is_active = TRUE
            "#,
        )
        .bind(user_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PushSubscription::from).collect())
    }

    async fn active_for_hospital(
        &self,
        hospital_id: &str,
        role: Option<&str>,
    ) -> Result<Vec<PushSubscription>, RepositoryError> {
        let rows = sqlx::query_as::<_, PushSubscriptionRow>(
            r#"
            SELECT s.id, s.user_id, s.endpoint, s.p256dh, s.auth, s.preferences,
                   s.is_active, s.last_used_at, s.created_at
            FROM push_subscriptions s
            JOIN users u ON u.id = s.user_id
            WHERE u.hospital_id = $1
              AND ($2::text IS NULL OR u.role = $2)
              AND s.is_active = TRUE
            "#,
        )
        .bind(hospital_id)
        .bind(role)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PushSubscription::from).collect())
    }

    async fn touch_last_used(&self, id: i32, at: OffsetDateTime) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE push_subscriptions
            SET last_used_at = $2
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn deactivate(&self, id: i32) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            UPDATE push_subscriptions
            SET is_active = FALSE
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
