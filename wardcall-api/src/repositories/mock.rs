//! Mock repository implementations for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use time::OffsetDateTime;

use crate::domain::PushSubscription;

use super::{
    DeliveryLogEntry, DeliveryLogRepository, NewDeliveryLogEntry, RepositoryError,
    SubscriptionRepository,
};

/// In-memory subscription store with a small staff directory backing the
/// hospital/role targeting modes.
#[derive(Clone, Default)]
pub struct MockSubscriptionRepository {
    subscriptions: Arc<RwLock<Vec<PushSubscription>>>,
    staff: Arc<RwLock<HashMap<String, (String, String)>>>,
}

#[allow(dead_code)]
impl MockSubscriptionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_subscription(self, subscription: PushSubscription) -> Self {
        self.subscriptions.write().unwrap().push(subscription);
        self
    }

    /// Registers a user in the staff directory as (hospital, role).
    pub fn with_staff(self, user_id: &str, hospital_id: &str, role: &str) -> Self {
        self.staff.write().unwrap().insert(
            user_id.to_string(),
            (hospital_id.to_string(), role.to_string()),
        );
        self
    }

    pub fn get(&self, id: i32) -> Option<PushSubscription> {
        self.subscriptions
            .read()
            .unwrap()
            .iter()
            .find(|subscription| subscription.id == id)
            .cloned()
    }
}

#[async_trait]
impl SubscriptionRepository for MockSubscriptionRepository {
    async fn active_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<PushSubscription>, RepositoryError> {
        Ok(self
            .subscriptions
            .read()
            .unwrap()
            .iter()
            .filter(|s| s.is_active && s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn active_for_users(
        &self,
        user_ids: &[String],
    ) -> Result<Vec<PushSubscription>, RepositoryError> {
        Ok(self
            .subscriptions
            .read()
            .unwrap()
            .iter()
            .filter(|s| s.is_active && user_ids.contains(&s.user_id))
            .cloned()
            .collect())
    }

    async fn active_for_hospital(
        &self,
        hospital_id: &str,
        role: Option<&str>,
    ) -> Result<Vec<PushSubscription>, RepositoryError> {
        let staff = self.staff.read().unwrap();
        Ok(self
            .subscriptions
            .read()
            .unwrap()
            .iter()
            .filter(|s| {
                s.is_active
                    && staff.get(&s.user_id).is_some_and(|(hospital, user_role)| {
                        hospital == hospital_id && role.map_or(true, |r| user_role == r)
                    })
            })
            .cloned()
            .collect())
    }

    async fn touch_last_used(&self, id: i32, at: OffsetDateTime) -> Result<(), RepositoryError> {
        let mut subscriptions = self.subscriptions.write().unwrap();
        if let Some(subscription) = subscriptions.iter_mut().find(|s| s.id == id) {
            subscription.last_used_at = Some(at);
        }
        Ok(())
    }

    async fn deactivate(&self, id: i32) -> Result<(), RepositoryError> {
        let mut subscriptions = self.subscriptions.write().unwrap();
        if let Some(subscription) = subscriptions.iter_mut().find(|s| s.id == id) {
            subscription.is_active = false;
        }
        Ok(())
    }
}

/// In-memory delivery ledger. [`MockDeliveryLogRepository::failing`] makes
/// every append return a database error so callers' best-effort handling can
/// be exercised.
#[derive(Clone, Default)]
pub struct MockDeliveryLogRepository {
    entries: Arc<RwLock<Vec<DeliveryLogEntry>>>,
    fail_appends: Arc<AtomicBool>,
}

#[allow(dead_code)]
impl MockDeliveryLogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        let repo = Self::default();
        repo.fail_appends.store(true, Ordering::Relaxed);
        repo
    }

    pub fn entries(&self) -> Vec<DeliveryLogEntry> {
        self.entries.read().unwrap().clone()
    }
}

#[async_trait]
impl DeliveryLogRepository for MockDeliveryLogRepository {
    async fn append(&self, entry: NewDeliveryLogEntry) -> Result<(), RepositoryError> {
        if self.fail_appends.load(Ordering::Relaxed) {
            return Err(RepositoryError::DatabaseError(sqlx::Error::PoolClosed));
        }

        let mut entries = self.entries.write().unwrap();
        let id = entries.len() as i32 + 1;
        entries.push(DeliveryLogEntry {
            id,
            subscription_id: entry.subscription_id,
            user_id: entry.user_id,
            notification_type: entry.notification_type,
            title: entry.title,
            body: entry.body,
            data: entry.data,
            sent_at: OffsetDateTime::now_utc(),
        });
        Ok(())
    }
}
