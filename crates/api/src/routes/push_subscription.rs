use axum::{Json, extract::State};
use pushgate_services::gateway::SubscribeRequest;
use pushgate_services::push::{DeliveryReport, NotificationPayload};
use pushgate_services::store::SubscriptionKeys;
use serde::Deserialize;

use crate::{error::ApiError, extractors::auth::AuthUser, state::AppState};

#[derive(Debug, Deserialize)]
pub struct StoreRequest {
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub keys: KeysBody,
    #[serde(default, rename = "contentEncoding")]
    pub content_encoding: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct KeysBody {
    #[serde(default)]
    pub auth: String,
    #[serde(default)]
    pub p256dh: String,
}

#[derive(Debug, Deserialize)]
pub struct DestroyRequest {
    #[serde(default)]
    pub endpoint: String,
}

pub async fn store(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<StoreRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let request = SubscribeRequest {
        endpoint: body.endpoint,
        keys: SubscriptionKeys {
            p256dh: body.keys.p256dh,
            auth: body.keys.auth,
        },
        content_encoding: body.content_encoding,
    };

    state.gateway.subscribe(auth.subject, request).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn destroy(
    State(state): State<AppState>,
    _auth: AuthUser,
    Json(body): Json<DestroyRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    state.gateway.unsubscribe(&body.endpoint).await?;

    Ok(Json(serde_json::json!({ "success": true })))
}

pub async fn stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<serde_json::Value>, ApiError> {
    let stats = state.gateway.stats().await?;
    let subscribed = !state
        .gateway
        .subscriptions_of(&auth.subject)
        .await?
        .is_empty();

    Ok(Json(serde_json::json!({
        "active_subjects": stats.active_subjects,
        "total_subscriptions": stats.total_subscriptions,
        "subscribed": subscribed,
    })))
}

/// Sends the canned test notification to every device of the caller and
/// returns the delivery report.
pub async fn send_test(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<DeliveryReport>, ApiError> {
    let payload = NotificationPayload::test_message();
    let report = state
        .gateway
        .notify(&[auth.subject], &payload, None)
        .await?;

    Ok(Json(report))
}
