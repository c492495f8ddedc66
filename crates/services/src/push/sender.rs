use std::time::Duration;

use async_trait::async_trait;
use pushgate_config::VapidSettings;
use pushgate_db::models::{ContentEncoding, Subscription};
use web_push::{
    ContentEncoding as WireEncoding, SubscriptionInfo, VapidSignatureBuilder,
    WebPushMessageBuilder,
};

use super::DeliveryError;

/// Terminal classification of one send attempt.
#[derive(Debug, Clone)]
pub enum SendFailure {
    /// The push service reports the endpoint permanently gone (404/410).
    EndpointGone,
    /// Transient failure (429/5xx or a network error); worth retrying.
    Retryable { retry_after: Option<Duration> },
    /// Permanent failure unrelated to endpoint expiry (bad signature,
    /// oversized payload, malformed request).
    Rejected { reason: String },
}

/// One attempt against a push service. Implementations carry the wire
/// protocol; the engine owns timeouts, retries and store reconciliation.
#[async_trait]
pub trait PushSender: Send + Sync {
    /// Whole-call preconditions, checked once per `deliver` before any
    /// attempt is made.
    fn ensure_configured(&self) -> Result<(), DeliveryError> {
        Ok(())
    }

    async fn send(
        &self,
        subscription: &Subscription,
        message: &[u8],
        ttl: u32,
    ) -> Result<(), SendFailure>;
}

/// Web Push wire protocol sender. The `web-push` crate does the RFC 8291
/// payload encryption and VAPID signing; the HTTP POST goes through
/// reqwest so the response status can be classified directly.
pub struct WebPushSender {
    vapid: VapidSettings,
    client: reqwest::Client,
}

impl WebPushSender {
    pub fn new(vapid: VapidSettings) -> Self {
        Self {
            vapid,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    fn ensure_configured(&self) -> Result<(), DeliveryError> {
        if self.vapid.private_key.trim().is_empty() || self.vapid.public_key.trim().is_empty() {
            return Err(DeliveryError::Config(
                "VAPID key pair is not configured".to_string(),
            ));
        }
        if self.vapid.subject.trim().is_empty() {
            return Err(DeliveryError::Config(
                "VAPID subject is not configured".to_string(),
            ));
        }
        Ok(())
    }

    async fn send(
        &self,
        subscription: &Subscription,
        message: &[u8],
        ttl: u32,
    ) -> Result<(), SendFailure> {
        let info = SubscriptionInfo::new(
            &subscription.endpoint,
            &subscription.p256dh,
            &subscription.auth,
        );

        let mut signature = VapidSignatureBuilder::from_base64(&self.vapid.private_key, &info)
            .map_err(|e| SendFailure::Rejected {
                reason: format!("VAPID signature: {e}"),
            })?;
        signature.add_claim("sub", self.vapid.subject.as_str());

        let mut builder = WebPushMessageBuilder::new(&info);
        builder.set_payload(wire_encoding(subscription.content_encoding), message);
        builder.set_ttl(ttl);
        builder.set_vapid_signature(signature.build().map_err(|e| SendFailure::Rejected {
            reason: format!("VAPID signature: {e}"),
        })?);

        let push_message = builder.build().map_err(|e| SendFailure::Rejected {
            reason: format!("message build: {e}"),
        })?;

        let mut request = self
            .client
            .post(push_message.endpoint.to_string())
            .header("TTL", push_message.ttl.to_string());

        if let Some(urgency) = push_message.urgency {
            request = request.header("Urgency", urgency.to_string());
        }
        if let Some(topic) = push_message.topic {
            request = request.header("Topic", topic);
        }

        if let Some(payload) = push_message.payload {
            request = request
                .header("Content-Encoding", payload.content_encoding.to_str())
                .header("Content-Type", "application/octet-stream");

            for (key, value) in &payload.crypto_headers {
                request = request.header(*key, value.as_str());
            }

            request = request.body(payload.content);
        }

        let response = request
            .send()
            .await
            .map_err(|_| SendFailure::Retryable { retry_after: None })?;

        let retry_after = parse_retry_after(&response);
        match response.status().as_u16() {
            200..=299 => Ok(()),
            404 | 410 => Err(SendFailure::EndpointGone),
            429 | 500..=599 => Err(SendFailure::Retryable { retry_after }),
            status => Err(SendFailure::Rejected {
                reason: format!("HTTP {status}"),
            }),
        }
    }
}

fn wire_encoding(encoding: ContentEncoding) -> WireEncoding {
    match encoding {
        ContentEncoding::Aes128Gcm => WireEncoding::Aes128Gcm,
        ContentEncoding::AesGcm => WireEncoding::AesGcm,
    }
}

fn parse_retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
