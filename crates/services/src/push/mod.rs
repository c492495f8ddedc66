pub mod engine;
pub mod sender;

use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::store::StoreError;

pub use engine::DeliveryEngine;
pub use sender::{PushSender, SendFailure, WebPushSender};

#[derive(Debug, Error)]
pub enum DeliveryError {
    /// Whole-call misconfiguration; no attempts were made.
    #[error("delivery misconfigured: {0}")]
    Config(String),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("payload serialization error: {0}")]
    Payload(#[from] serde_json::Error),
}

/// The message to deliver. Constructed per send request, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_url: Option<String>,
    /// Opaque mapping forwarded to the client untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    /// Delivery expiry hint passed to the push service as the TTL header.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_seconds: Option<u32>,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: None,
            badge: None,
            action_url: None,
            data: None,
            ttl_seconds: None,
        }
    }

    /// Canned payload sent by the test endpoint.
    pub fn test_message() -> Self {
        Self {
            title: "Test push notification".to_string(),
            body: "This is a test push notification".to_string(),
            icon: None,
            badge: None,
            action_url: Some("/".to_string()),
            data: None,
            ttl_seconds: Some(3600),
        }
    }

    /// JSON bytes shown to the service worker. The TTL travels as a
    /// request header, not in the body.
    pub fn to_client_message(&self) -> Result<Vec<u8>, serde_json::Error> {
        let mut message = serde_json::Map::new();
        message.insert("title".to_string(), json!(self.title));
        message.insert("body".to_string(), json!(self.body));
        if let Some(icon) = &self.icon {
            message.insert("icon".to_string(), json!(icon));
        }
        if let Some(badge) = &self.badge {
            message.insert("badge".to_string(), json!(badge));
        }
        if let Some(action_url) = &self.action_url {
            message.insert("action_url".to_string(), json!(action_url));
        }
        if let Some(data) = &self.data {
            message.insert("data".to_string(), data.clone());
        }
        serde_json::to_vec(&message)
    }
}

/// Per-call outcome summary. The sole channel for partial-failure
/// visibility: individual subscription failures never fail the call.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DeliveryReport {
    pub delivered: usize,
    /// Endpoints the push service reported permanently gone; their
    /// subscriptions were removed from the store.
    pub expired: usize,
    /// Transient failures that exhausted the retry budget.
    pub failed: usize,
    /// Permanent failures unrelated to endpoint expiry.
    pub rejected: usize,
    /// Not attempted before the caller's deadline; safe to re-deliver.
    pub skipped: usize,
    pub removed: Vec<String>,
}

impl DeliveryReport {
    pub fn total(&self) -> usize {
        self.delivered + self.expired + self.failed + self.rejected + self.skipped
    }
}
