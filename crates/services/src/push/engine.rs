use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use futures::{StreamExt, stream};
use pushgate_config::DeliverySettings;
use pushgate_db::models::Subscription;
use rand::Rng;
use tokio::time::{Instant, timeout};
use tracing::{debug, warn};

use super::sender::{PushSender, SendFailure};
use super::{DeliveryError, DeliveryReport, NotificationPayload};
use crate::store::{SubjectRef, SubscriptionStore};

/// Delivers one payload to every subscription of a set of subjects and
/// reconciles the store with the outcomes. Deliveries to distinct
/// subscriptions are independent; retries within one subscription are
/// strictly sequential.
pub struct DeliveryEngine {
    store: Arc<dyn SubscriptionStore>,
    sender: Arc<dyn PushSender>,
    settings: DeliverySettings,
}

enum Outcome {
    Delivered,
    Expired,
    Failed,
    Rejected,
    Skipped,
}

impl DeliveryEngine {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        sender: Arc<dyn PushSender>,
        settings: DeliverySettings,
    ) -> Self {
        Self {
            store,
            sender,
            settings,
        }
    }

    /// Fan out `payload` to every subscription of `subjects`. Fails as a
    /// whole only for misconfiguration or an unreachable store; individual
    /// subscription outcomes land in the report. Subscriptions not yet
    /// attempted when `deadline` passes are reported as skipped with no
    /// attempts consumed, so the caller can re-invoke safely.
    pub async fn deliver(
        &self,
        subjects: &[SubjectRef],
        payload: &NotificationPayload,
        deadline: Option<Instant>,
    ) -> Result<DeliveryReport, DeliveryError> {
        self.sender.ensure_configured()?;

        let mut subscriptions = Vec::new();
        for subject in subjects {
            subscriptions.extend(self.store.list_by_subject(subject).await?);
        }
        // A repeated subject must not dispatch twice to the same endpoint
        let mut seen = HashSet::new();
        subscriptions.retain(|s| seen.insert(s.endpoint.clone()));

        let message = payload.to_client_message()?;
        let ttl = payload.ttl_seconds.unwrap_or(self.settings.default_ttl_secs);

        debug!(
            subjects = subjects.len(),
            subscriptions = subscriptions.len(),
            "dispatching notification"
        );

        let outcomes = stream::iter(subscriptions.into_iter().map(|subscription| {
            let message = message.as_slice();
            async move {
                let endpoint = subscription.endpoint.clone();
                let outcome = self
                    .deliver_one(&subscription, message, ttl, deadline)
                    .await;
                (endpoint, outcome)
            }
        }))
        .buffer_unordered(self.settings.concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

        let mut report = DeliveryReport::default();
        for (endpoint, outcome) in outcomes {
            match outcome {
                Outcome::Delivered => report.delivered += 1,
                Outcome::Expired => {
                    report.expired += 1;
                    report.removed.push(endpoint);
                }
                Outcome::Failed => report.failed += 1,
                Outcome::Rejected => report.rejected += 1,
                Outcome::Skipped => report.skipped += 1,
            }
        }

        if report.rejected > 0 {
            warn!(
                rejected = report.rejected,
                "push service rejected deliveries; check VAPID configuration and payload size"
            );
        }

        Ok(report)
    }

    async fn deliver_one(
        &self,
        subscription: &Subscription,
        message: &[u8],
        ttl: u32,
        deadline: Option<Instant>,
    ) -> Outcome {
        let max_attempts = self.settings.max_attempts.max(1);
        let per_attempt = Duration::from_secs(self.settings.request_timeout_secs);
        let mut attempt = 0u32;

        loop {
            if let Some(deadline) = deadline {
                if Instant::now() >= deadline {
                    return if attempt == 0 {
                        Outcome::Skipped
                    } else {
                        Outcome::Failed
                    };
                }
            }
            attempt += 1;

            let result = match timeout(per_attempt, self.sender.send(subscription, message, ttl))
                .await
            {
                Ok(result) => result,
                Err(_) => Err(SendFailure::Retryable { retry_after: None }),
            };

            match result {
                Ok(()) => {
                    debug!(endpoint = %subscription.endpoint, attempt, "delivered");
                    return Outcome::Delivered;
                }
                Err(SendFailure::EndpointGone) => {
                    debug!(endpoint = %subscription.endpoint, "endpoint gone; removing subscription");
                    if let Err(error) = self.store.delete(&subscription.endpoint).await {
                        warn!(endpoint = %subscription.endpoint, %error, "failed to remove expired subscription");
                    }
                    return Outcome::Expired;
                }
                Err(SendFailure::Rejected { reason }) => {
                    warn!(endpoint = %subscription.endpoint, %reason, "delivery rejected");
                    return Outcome::Rejected;
                }
                Err(SendFailure::Retryable { retry_after }) => {
                    if attempt >= max_attempts {
                        warn!(endpoint = %subscription.endpoint, attempts = attempt, "retries exhausted");
                        return Outcome::Failed;
                    }
                    let delay = retry_delay(&self.settings, attempt, retry_after);
                    debug!(
                        endpoint = %subscription.endpoint,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "transient delivery failure; backing off"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Exponential floor for the wait after `attempt` failed attempts:
/// base doubling per attempt, capped.
fn backoff_floor(settings: &DeliverySettings, attempt: u32) -> Duration {
    let base = settings.retry_base_ms.max(1);
    let cap = settings.retry_cap_ms.max(base);
    let exp = base.saturating_mul(1u64 << (attempt - 1).min(20));
    Duration::from_millis(exp.min(cap))
}

/// Floor plus uniform jitter on top, so retries spread out but never fire
/// before their floor. A push-service Retry-After hint wins when larger.
fn retry_delay(
    settings: &DeliverySettings,
    attempt: u32,
    retry_after: Option<Duration>,
) -> Duration {
    let floor = backoff_floor(settings, attempt);
    let jitter = Duration::from_millis(rand::rng().random_range(0..=floor.as_millis() as u64));
    let delay = floor + jitter;
    match retry_after {
        Some(hint) if hint > delay => hint,
        _ => delay,
    }
}
