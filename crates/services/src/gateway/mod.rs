use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use pushgate_db::models::{ContentEncoding, Subscription};
use serde::Serialize;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::push::{DeliveryEngine, DeliveryError, DeliveryReport, NotificationPayload};
use crate::store::{StoreError, SubjectRef, SubscriptionKeys, SubscriptionStore};

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Validation: {0}")]
    Validation(String),
    #[error("Unknown subject: {0}")]
    UnknownSubject(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Delivery(#[from] DeliveryError),
}

/// Host-supplied capability: decide whether a subject reference names a
/// real owner. Consulted on every subscribe before the store is touched.
#[async_trait]
pub trait SubjectResolver: Send + Sync {
    async fn exists(&self, subject: &SubjectRef) -> Result<bool, StoreError>;
}

/// Accepts subjects whose type is in a configured allowlist. The host
/// already authenticates callers and mints their tokens, so type-level
/// screening is the check this service can make on its own.
pub struct TypedSubjectResolver {
    subject_types: Vec<String>,
}

impl TypedSubjectResolver {
    pub fn new(subject_types: Vec<String>) -> Self {
        Self { subject_types }
    }
}

#[async_trait]
impl SubjectResolver for TypedSubjectResolver {
    async fn exists(&self, subject: &SubjectRef) -> Result<bool, StoreError> {
        Ok(!subject.subject_id.trim().is_empty()
            && self
                .subject_types
                .iter()
                .any(|t| t == &subject.subject_type))
    }
}

/// Store mutations announced to registered observers.
#[derive(Debug, Clone)]
pub enum GatewayEvent {
    SubscriptionCreated { subscription: Subscription },
    SubscriptionDeleted { endpoint: String },
}

type EventObserver = Box<dyn Fn(&GatewayEvent) -> anyhow::Result<()> + Send + Sync>;

/// Incoming registration as received from the HTTP boundary.
#[derive(Debug, Clone)]
pub struct SubscribeRequest {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
    pub content_encoding: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionStats {
    pub active_subjects: u64,
    pub total_subscriptions: u64,
}

/// Boundary API mediating between untrusted client requests and the
/// store/engine. Observer callbacks run synchronously after a successful
/// store mutation; their failures are logged, never propagated.
pub struct PushGateway {
    store: Arc<dyn SubscriptionStore>,
    engine: DeliveryEngine,
    resolver: Arc<dyn SubjectResolver>,
    observers: RwLock<Vec<EventObserver>>,
}

impl PushGateway {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        engine: DeliveryEngine,
        resolver: Arc<dyn SubjectResolver>,
    ) -> Self {
        Self {
            store,
            engine,
            resolver,
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn on_event(
        &self,
        observer: impl Fn(&GatewayEvent) -> anyhow::Result<()> + Send + Sync + 'static,
    ) {
        self.observers.write().push(Box::new(observer));
    }

    pub async fn subscribe(
        &self,
        subject: SubjectRef,
        request: SubscribeRequest,
    ) -> Result<Subscription, GatewayError> {
        let encoding = match request.content_encoding.as_deref() {
            None => ContentEncoding::default(),
            Some(raw) => ContentEncoding::parse(raw).ok_or_else(|| {
                GatewayError::Validation(format!("unsupported content encoding: {raw}"))
            })?,
        };

        if !self.resolver.exists(&subject).await? {
            return Err(GatewayError::UnknownSubject(subject.to_string()));
        }

        let subscription = self
            .store
            .upsert(&subject, &request.endpoint, &request.keys, encoding)
            .await?;
        debug!(subject = %subject, endpoint = %subscription.endpoint, "subscription registered");

        self.emit(&GatewayEvent::SubscriptionCreated {
            subscription: subscription.clone(),
        });
        Ok(subscription)
    }

    /// Idempotent: succeeds whether or not the endpoint was registered.
    pub async fn unsubscribe(&self, endpoint: &str) -> Result<bool, GatewayError> {
        if endpoint.trim().is_empty() {
            return Err(GatewayError::Validation("endpoint is required".to_string()));
        }

        let existed = self.store.delete(endpoint).await?;
        if existed {
            debug!(endpoint, "subscription removed");
            self.emit(&GatewayEvent::SubscriptionDeleted {
                endpoint: endpoint.to_string(),
            });
        }
        Ok(existed)
    }

    /// Internal-only; not exposed to browser clients.
    pub async fn notify(
        &self,
        subjects: &[SubjectRef],
        payload: &NotificationPayload,
        deadline: Option<Instant>,
    ) -> Result<DeliveryReport, GatewayError> {
        Ok(self.engine.deliver(subjects, payload, deadline).await?)
    }

    pub async fn stats(&self) -> Result<SubscriptionStats, GatewayError> {
        Ok(SubscriptionStats {
            active_subjects: self.store.count_distinct_subjects().await?,
            total_subscriptions: self.store.count_subscriptions().await?,
        })
    }

    pub async fn subscriptions_of(
        &self,
        subject: &SubjectRef,
    ) -> Result<Vec<Subscription>, GatewayError> {
        Ok(self.store.list_by_subject(subject).await?)
    }

    fn emit(&self, event: &GatewayEvent) {
        for observer in self.observers.read().iter() {
            if let Err(error) = observer(event) {
                warn!(%error, "gateway observer failed");
            }
        }
    }
}
