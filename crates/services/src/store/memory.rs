use std::collections::HashSet;

use async_trait::async_trait;
use bson::{DateTime, oid::ObjectId};
use parking_lot::Mutex;
use pushgate_db::models::{ContentEncoding, Subscription};

use super::{StoreResult, SubjectRef, SubscriptionKeys, SubscriptionStore, validate_registration};

/// In-process store for tests and single-process embedding. Records are
/// kept in insertion order; the global lock gives the same per-endpoint
/// serialization the unique index provides in MongoDB.
pub struct MemorySubscriptionStore {
    records: Mutex<Vec<Subscription>>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    pub fn snapshot(&self) -> Vec<Subscription> {
        self.records.lock().clone()
    }
}

impl Default for MemorySubscriptionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn upsert(
        &self,
        subject: &SubjectRef,
        endpoint: &str,
        keys: &SubscriptionKeys,
        encoding: ContentEncoding,
    ) -> StoreResult<Subscription> {
        validate_registration(endpoint, keys)?;

        let mut records = self.records.lock();
        let now = DateTime::now();

        if let Some(existing) = records.iter_mut().find(|s| s.endpoint == endpoint) {
            existing.subject_type = subject.subject_type.clone();
            existing.subject_id = subject.subject_id.clone();
            existing.p256dh = keys.p256dh.clone();
            existing.auth = keys.auth.clone();
            existing.content_encoding = encoding;
            existing.updated_at = now;
            return Ok(existing.clone());
        }

        let subscription = Subscription {
            id: Some(ObjectId::new()),
            subject_type: subject.subject_type.clone(),
            subject_id: subject.subject_id.clone(),
            endpoint: endpoint.to_string(),
            p256dh: keys.p256dh.clone(),
            auth: keys.auth.clone(),
            content_encoding: encoding,
            created_at: now,
            updated_at: now,
        };
        records.push(subscription.clone());
        Ok(subscription)
    }

    async fn delete(&self, endpoint: &str) -> StoreResult<bool> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|s| s.endpoint != endpoint);
        Ok(records.len() < before)
    }

    async fn list_by_subject(&self, subject: &SubjectRef) -> StoreResult<Vec<Subscription>> {
        let records = self.records.lock();
        Ok(records
            .iter()
            .filter(|s| s.subject_type == subject.subject_type && s.subject_id == subject.subject_id)
            .cloned()
            .collect())
    }

    async fn count_distinct_subjects(&self) -> StoreResult<u64> {
        let records = self.records.lock();
        let subjects: HashSet<(&str, &str)> = records
            .iter()
            .map(|s| (s.subject_type.as_str(), s.subject_id.as_str()))
            .collect();
        Ok(subjects.len() as u64)
    }

    async fn count_subscriptions(&self) -> StoreResult<u64> {
        Ok(self.records.lock().len() as u64)
    }
}
