use async_trait::async_trait;
use sqlx::PgPool;
use time::OffsetDateTime;

use super::repo_error::RepositoryError;

/// Append-only ledger of accepted deliveries. Rows are never read back by
/// this service; they exist for support and audit queries.
#[async_trait]
pub trait DeliveryLogRepository: Send + Sync {
    async fn append(&self, entry: NewDeliveryLogEntry) -> Result<(), RepositoryError>;
}

#[derive(Debug, Clone)]
pub struct DeliveryLogEntry {
    pub id: i32,
    pub subscription_id: i32,
    pub user_id: String,
    pub notification_type: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub data: Option<serde_json::Value>,
    pub sent_at: OffsetDateTime,
}

pub struct DeliveryLogRepositoryImpl {
    pool: PgPool,
}

impl DeliveryLogRepositoryImpl {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeliveryLogRepository for DeliveryLogRepositoryImpl {
    async fn append(&self, entry: NewDeliveryLogEntry) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO push_notification_log (
                subscription_id, user_id, notification_type, title, body, data
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(entry.subscription_id)
        .bind(&entry.user_id)
        .bind(&entry.notification_type)
        .bind(&entry.title)
        .bind(&entry.body)
        .bind(&entry.data)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

pub struct NewDeliveryLogEntry {
    pub subscription_id: i32,
    pub user_id: String,
    pub notification_type: Option<String>,
    pub title: String,
    pub body: Option<String>,
    pub data: Option<serde_json::Value>,
}
