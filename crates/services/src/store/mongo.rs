use async_trait::async_trait;
use bson::{DateTime, doc};
use futures::TryStreamExt;
use mongodb::{Collection, Database, options::ReturnDocument};
use pushgate_db::models::{ContentEncoding, Subscription};
use tracing::debug;

use super::{
    StoreError, StoreResult, SubjectRef, SubscriptionKeys, SubscriptionStore, validate_registration,
};

/// Production store. The unique index on `endpoint` (see
/// `pushgate_db::indexes`) serializes concurrent upserts for the same
/// registration.
pub struct MongoSubscriptionStore {
    collection: Collection<Subscription>,
}

impl MongoSubscriptionStore {
    pub fn new(db: &Database, collection_name: &str) -> Self {
        Self {
            collection: db.collection::<Subscription>(collection_name),
        }
    }

    async fn upsert_once(
        &self,
        subject: &SubjectRef,
        endpoint: &str,
        keys: &SubscriptionKeys,
        encoding: ContentEncoding,
    ) -> Result<Option<Subscription>, mongodb::error::Error> {
        let now = DateTime::now();
        let update = doc! {
            "$set": {
                "subject_type": subject.subject_type.as_str(),
                "subject_id": subject.subject_id.as_str(),
                "p256dh": keys.p256dh.as_str(),
                "auth": keys.auth.as_str(),
                "content_encoding": encoding.as_str(),
                "updated_at": now,
            },
            "$setOnInsert": {
                "created_at": now,
            },
        };

        self.collection
            .find_one_and_update(doc! { "endpoint": endpoint }, update)
            .upsert(true)
            .return_document(ReturnDocument::After)
            .await
    }
}

#[async_trait]
impl SubscriptionStore for MongoSubscriptionStore {
    async fn upsert(
        &self,
        subject: &SubjectRef,
        endpoint: &str,
        keys: &SubscriptionKeys,
        encoding: ContentEncoding,
    ) -> StoreResult<Subscription> {
        validate_registration(endpoint, keys)?;

        match self.upsert_once(subject, endpoint, keys, encoding).await {
            Ok(Some(subscription)) => Ok(subscription),
            Ok(None) => Err(StoreError::NotFound),
            Err(e) if is_duplicate_key(&e) => {
                // Lost the insert race against a concurrent registration of
                // the same endpoint; the retry takes the update path.
                debug!(endpoint, "upsert raced an insert; retrying");
                self.upsert_once(subject, endpoint, keys, encoding)
                    .await?
                    .ok_or(StoreError::NotFound)
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, endpoint: &str) -> StoreResult<bool> {
        let result = self
            .collection
            .delete_one(doc! { "endpoint": endpoint })
            .await?;
        Ok(result.deleted_count > 0)
    }

    async fn list_by_subject(&self, subject: &SubjectRef) -> StoreResult<Vec<Subscription>> {
        let mut cursor = self
            .collection
            .find(doc! {
                "subject_type": subject.subject_type.as_str(),
                "subject_id": subject.subject_id.as_str(),
            })
            .sort(doc! { "_id": 1 })
            .await?;

        let mut results = Vec::new();
        while let Some(subscription) = cursor.try_next().await? {
            results.push(subscription);
        }
        Ok(results)
    }

    async fn count_distinct_subjects(&self) -> StoreResult<u64> {
        let pipeline = vec![
            doc! { "$group": { "_id": { "subject_type": "$subject_type", "subject_id": "$subject_id" } } },
            doc! { "$count": "subjects" },
        ];

        let mut cursor = self.collection.aggregate(pipeline).await?;
        let count = match cursor.try_next().await? {
            Some(doc) => doc.get_i32("subjects").map(|n| n as u64).unwrap_or(0),
            None => 0,
        };
        Ok(count)
    }

    async fn count_subscriptions(&self) -> StoreResult<u64> {
        Ok(self.collection.count_documents(doc! {}).await?)
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    match *e.kind {
        mongodb::error::ErrorKind::Write(mongodb::error::WriteFailure::WriteError(
            ref write_error,
        )) => write_error.code == 11000,
        mongodb::error::ErrorKind::Command(ref command_error) => command_error.code == 11000,
        _ => false,
    }
}
