use bson::{DateTime, oid::ObjectId};
use serde::{Deserialize, Serialize};

/// One browser endpoint registration, owned by a polymorphic subject.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscription {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub subject_type: String,
    pub subject_id: String,
    /// Push-service URL; unique per browser/device/profile.
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    #[serde(default)]
    pub content_encoding: ContentEncoding,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Subscription {
    pub const COLLECTION: &'static str = "push_subscriptions";
}

/// Payload encryption scheme negotiated with the push service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentEncoding {
    #[default]
    Aes128Gcm,
    AesGcm,
}

impl ContentEncoding {
    /// Accepts the wire names; an empty string means the client did not
    /// negotiate and gets the current standard.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "" | "aes128gcm" => Some(ContentEncoding::Aes128Gcm),
            "aesgcm" => Some(ContentEncoding::AesGcm),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentEncoding::Aes128Gcm => "aes128gcm",
            ContentEncoding::AesGcm => "aesgcm",
        }
    }
}
