use std::sync::Arc;

use futures::future;
use time::{OffsetDateTime, UtcOffset};
use tracing::instrument;
use url::Url;
use webpush::{VapidSigner, WebPushClient, WebPushMessage};

use crate::repositories::{DeliveryLogRepository, NewDeliveryLogEntry, SubscriptionRepository};

use super::delivery_policy::{self, PolicyDecision};
use super::{
    DispatchError, DispatchSummary, DispatchTarget, NotificationPayload, PushSubscription,
};

/// Outcome of one subscription's delivery attempt. Failures are folded into
/// the tally and never escape the per-subscription future.
enum DeliveryOutcome {
    Sent,
    Failed,
}

/// Fans one notification out to every eligible subscription of a target:
/// resolve, filter, then sign + encrypt + POST per subscription.
pub struct NotificationDispatcher {
    subscription_repo: Arc<dyn SubscriptionRepository>,
    delivery_log_repo: Arc<dyn DeliveryLogRepository>,
    vapid: Option<VapidSigner>,
    push_client: WebPushClient,
    utc_offset: UtcOffset,
}

impl NotificationDispatcher {
    pub fn new(
        subscription_repo: Arc<dyn SubscriptionRepository>,
        delivery_log_repo: Arc<dyn DeliveryLogRepository>,
        vapid: Option<VapidSigner>,
        push_client: WebPushClient,
        utc_offset: UtcOffset,
    ) -> Self {
        Self {
            subscription_repo,
            delivery_log_repo,
            vapid,
            push_client,
            utc_offset,
        }
    }

    #[instrument(
        name = "NotificationDispatcher::dispatch",
        skip_all,
        fields(target = %target)
    )]
    pub async fn dispatch(
        &self,
        target: &DispatchTarget,
        payload: &NotificationPayload,
    ) -> Result<DispatchSummary, DispatchError> {
        let vapid = self.vapid.as_ref().ok_or(DispatchError::VapidNotConfigured)?;

        let subscriptions = self.resolve(target).await?;
        if subscriptions.is_empty() {
            tracing::info!("No active subscriptions for {}", target);
            return Ok(DispatchSummary::no_recipients());
        }

        // Quiet hours are defined on the hospital's wall clock.
        let local_time = OffsetDateTime::now_utc().to_offset(self.utc_offset).time();
        let mut recipients = Vec::with_capacity(subscriptions.len());
        let mut skipped = 0;
        for subscription in subscriptions {
            match delivery_policy::evaluate(&subscription.preferences, payload, local_time) {
                PolicyDecision::Deliver => recipients.push(subscription),
                PolicyDecision::Skip(reason) => {
                    tracing::debug!("Skipping subscription {} ({})", subscription.id, reason);
                    skipped += 1;
                }
            }
        }

        let body = serde_json::to_vec(payload)?;

        // Deliver concurrently; every future settles to its own outcome.
        let deliveries = recipients
            .into_iter()
            .map(|subscription| self.deliver(subscription, vapid, payload, &body));

        let mut sent = 0;
        let mut failed = 0;
        for outcome in future::join_all(deliveries).await {
            match outcome {
                DeliveryOutcome::Sent => sent += 1,
                DeliveryOutcome::Failed => failed += 1,
            }
        }

        tracing::info!(
            "Dispatched to {}: {} sent, {} failed, {} skipped",
            target,
            sent,
            failed,
            skipped
        );
        Ok(DispatchSummary::tallied(sent, failed, skipped))
    }

    async fn resolve(
        &self,
        target: &DispatchTarget,
    ) -> Result<Vec<PushSubscription>, DispatchError> {
        let subscriptions = match target {
            DispatchTarget::User(user_id) => {
                self.subscription_repo.active_for_user(user_id).await?
            }
            DispatchTarget::Users(user_ids) => {
                self.subscription_repo.active_for_users(user_ids).await?
            }
            DispatchTarget::HospitalRole { hospital_id, role } => {
                self.subscription_repo
                    .active_for_hospital(hospital_id, Some(role))
                    .await?
            }
            DispatchTarget::Hospital(hospital_id) => {
                self.subscription_repo
                    .active_for_hospital(hospital_id, None)
                    .await?
            }
        };

        Ok(subscriptions)
    }

    async fn deliver(
        &self,
        subscription: PushSubscription,
        vapid: &VapidSigner,
        payload: &NotificationPayload,
        body: &[u8],
    ) -> DeliveryOutcome {
        let keys = match subscription.client_keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!("Subscription {} has unusable keys: {}", subscription.id, e);
                return DeliveryOutcome::Failed;
            }
        };
        let endpoint = match Url::parse(&subscription.endpoint) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                tracing::warn!(
                    "Subscription {} has an invalid endpoint: {}",
                    subscription.id,
                    e
                );
                return DeliveryOutcome::Failed;
            }
        };
        let authorization = match vapid.authorization(&endpoint) {
            Ok(authorization) => authorization,
            Err(e) => {
                tracing::warn!(
                    "VAPID signing failed for subscription {}: {}",
                    subscription.id,
                    e
                );
                return DeliveryOutcome::Failed;
            }
        };
        let encrypted = match webpush::encrypt(&keys, body) {
            Ok(encrypted) => encrypted,
            Err(e) => {
                tracing::warn!(
                    "Encryption failed for subscription {}: {}",
                    subscription.id,
                    e
                );
                return DeliveryOutcome::Failed;
            }
        };

        let message = WebPushMessage {
            endpoint,
            authorization,
            body: encrypted,
        };
        match self.push_client.send(message).await {
            Ok(()) => {
                self.record_delivery(&subscription, payload).await;
                DeliveryOutcome::Sent
            }
            Err(e) if e.is_terminal() => {
                tracing::info!(
                    "Subscription {} is gone ({}), deactivating",
                    subscription.id,
                    e
                );
                if let Err(e) = self.subscription_repo.deactivate(subscription.id).await {
                    tracing::error!(
                        "Failed to deactivate subscription {}: {:?}",
                        subscription.id,
                        e
                    );
                }
                DeliveryOutcome::Failed
            }
            Err(e) => {
                tracing::warn!("Delivery to subscription {} failed: {}", subscription.id, e);
                DeliveryOutcome::Failed
            }
        }
    }

    /// Ledger writes are best-effort; a bookkeeping failure never turns a
    /// delivered notification into a failed one.
    async fn record_delivery(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) {
        let entry = NewDeliveryLogEntry {
            subscription_id: subscription.id,
            user_id: subscription.user_id.clone(),
            notification_type: payload.notification_type.map(|kind| kind.to_string()),
            title: payload.title.clone(),
            body: payload.body.clone(),
            data: payload.data.clone(),
        };
        if let Err(e) = self.delivery_log_repo.append(entry).await {
            tracing::error!(
                "Failed to record delivery for subscription {}: {:?}",
                subscription.id,
                e
            );
        }
        if let Err(e) = self
            .subscription_repo
            .touch_last_used(subscription.id, OffsetDateTime::now_utc())
            .await
        {
            tracing::error!("Failed to touch subscription {}: {:?}", subscription.id, e);
        }
    }
}
