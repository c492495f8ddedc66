pub mod memory;
pub mod mongo;

use std::fmt;

use async_trait::async_trait;
use pushgate_db::models::{ContentEncoding, Subscription};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use memory::MemorySubscriptionStore;
pub use mongo::MongoSubscriptionStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("MongoDB error: {0}")]
    Mongo(#[from] mongodb::error::Error),
    #[error("BSON serialization error: {0}")]
    BsonSer(#[from] bson::ser::Error),
    #[error("BSON deserialization error: {0}")]
    BsonDe(#[from] bson::de::Error),
    #[error("Entity not found")]
    NotFound,
    #[error("Validation: {0}")]
    Validation(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Owner of a subscription: a polymorphic (type, id) pair. A lookup key,
/// not an ownership pointer; resolving it to a real identity is the
/// host's job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubjectRef {
    pub subject_type: String,
    pub subject_id: String,
}

impl SubjectRef {
    pub fn new(subject_type: impl Into<String>, subject_id: impl Into<String>) -> Self {
        Self {
            subject_type: subject_type.into(),
            subject_id: subject_id.into(),
        }
    }
}

impl fmt::Display for SubjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.subject_type, self.subject_id)
    }
}

/// Client-side encryption keys reported by the browser on registration.
#[derive(Debug, Clone)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// Durable CRUD for subscription records, keyed by endpoint and queryable
/// by subject. Writes are durable before the call returns.
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    /// Insert or update the record for `endpoint`. Idempotent per endpoint:
    /// re-registering updates keys and encoding in place.
    async fn upsert(
        &self,
        subject: &SubjectRef,
        endpoint: &str,
        keys: &SubscriptionKeys,
        encoding: ContentEncoding,
    ) -> StoreResult<Subscription>;

    /// Remove the record for `endpoint`. Returns whether one existed;
    /// a missing endpoint is a no-op success.
    async fn delete(&self, endpoint: &str) -> StoreResult<bool>;

    /// All subscriptions owned by `subject`, oldest first.
    async fn list_by_subject(&self, subject: &SubjectRef) -> StoreResult<Vec<Subscription>>;

    /// Distinct (subject_type, subject_id) pairs with at least one
    /// subscription.
    async fn count_distinct_subjects(&self) -> StoreResult<u64>;

    /// Total subscription records.
    async fn count_subscriptions(&self) -> StoreResult<u64>;
}

pub(crate) fn validate_registration(endpoint: &str, keys: &SubscriptionKeys) -> StoreResult<()> {
    if endpoint.trim().is_empty() {
        return Err(StoreError::Validation("endpoint is required".to_string()));
    }
    if keys.p256dh.trim().is_empty() {
        return Err(StoreError::Validation("keys.p256dh is required".to_string()));
    }
    if keys.auth.trim().is_empty() {
        return Err(StoreError::Validation("keys.auth is required".to_string()));
    }
    Ok(())
}
