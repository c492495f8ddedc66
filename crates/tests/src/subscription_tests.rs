use serde_json::Value;

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn health_check_is_public() {
    let app = TestApp::spawn().await;

    let resp = app.client.get(app.url("/health")).send().await.unwrap();
    assert_eq!(resp.status().as_u16(), 200);
}

#[tokio::test]
async fn subscribe_requires_authentication() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/push-subscriptions"))
        .json(&serde_json::json!({
            "endpoint": app.endpoint(),
            "keys": { "auth": "a", "p256dh": "p" },
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn subscribe_rejects_missing_fields() {
    let app = TestApp::spawn().await;
    let token = app.token_for(&app.user("alice"));

    // No endpoint at all
    let resp = app
        .client
        .post(app.url("/push-subscriptions"))
        .bearer_auth(&token)
        .json(&serde_json::json!({}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    // Endpoint present, keys empty
    let resp = app
        .client
        .post(app.url("/push-subscriptions"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "endpoint": app.endpoint(),
            "keys": { "auth": "", "p256dh": "" },
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);

    assert_eq!(app.store.snapshot().len(), 0);
}

#[tokio::test]
async fn subscribe_persists_and_acknowledges() {
    let app = TestApp::spawn().await;
    let token = app.token_for(&app.user("alice"));
    let endpoint = app.endpoint();

    let resp = app.subscribe(&token, &endpoint).await;
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], true);

    let records = app.store.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].endpoint, endpoint);
    assert_eq!(records[0].subject_type, "user");
    assert_eq!(records[0].subject_id, "alice");
    assert_eq!(records[0].p256dh, "public-key");
    assert_eq!(records[0].auth, "auth-secret");
}

#[tokio::test]
async fn resubscribe_updates_keys_in_place() {
    let app = TestApp::spawn().await;
    let token = app.token_for(&app.user("alice"));
    let endpoint = app.endpoint();

    app.subscribe(&token, &endpoint).await;

    let resp = app
        .client
        .post(app.url("/push-subscriptions"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "endpoint": endpoint,
            "keys": { "auth": "rotated-auth", "p256dh": "rotated-key" },
            "contentEncoding": "aesgcm",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let records = app.store.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].p256dh, "rotated-key");
    assert_eq!(records[0].auth, "rotated-auth");
}

#[tokio::test]
async fn subscribe_rejects_unknown_content_encoding() {
    let app = TestApp::spawn().await;
    let token = app.token_for(&app.user("alice"));

    let resp = app
        .client
        .post(app.url("/push-subscriptions"))
        .bearer_auth(&token)
        .json(&serde_json::json!({
            "endpoint": app.endpoint(),
            "keys": { "auth": "a", "p256dh": "p" },
            "contentEncoding": "rot13",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 400);
}

#[tokio::test]
async fn subscribe_rejects_subject_type_outside_allowlist() {
    let app = TestApp::spawn().await;
    let token = app.token_for(&pushgate_services::store::SubjectRef::new("service", "batch"));

    let resp = app.subscribe(&token, &app.endpoint()).await;
    assert_eq!(resp.status().as_u16(), 400);
    assert_eq!(app.store.snapshot().len(), 0);
}

#[tokio::test]
async fn subject_type_allowlist_is_configurable() {
    let app = TestApp::spawn_with_settings(|settings| {
        settings.gateway.subject_types.push("device".to_string());
    })
    .await;
    let token = app.token_for(&pushgate_services::store::SubjectRef::new("device", "kiosk-7"));

    let resp = app.subscribe(&token, &app.endpoint()).await;
    assert_eq!(resp.status().as_u16(), 200);

    let records = app.store.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].subject_type, "device");
}

#[tokio::test]
async fn delete_is_idempotent() {
    let app = TestApp::spawn().await;
    let token = app.token_for(&app.user("alice"));
    let endpoint = app.endpoint();

    // Deleting an endpoint that never existed still succeeds
    let resp = app
        .client
        .post(app.url("/push-subscriptions/delete"))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "endpoint": endpoint }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["success"], true);

    app.subscribe(&token, &endpoint).await;
    assert_eq!(app.store.snapshot().len(), 1);

    let resp = app
        .client
        .post(app.url("/push-subscriptions/delete"))
        .bearer_auth(&token)
        .json(&serde_json::json!({ "endpoint": endpoint }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(app.store.snapshot().len(), 0);
}

#[tokio::test]
async fn stats_reflect_subjects_and_devices() {
    let app = TestApp::spawn().await;
    let alice_token = app.token_for(&app.user("alice"));
    let bob_token = app.token_for(&app.user("bob"));
    let carol_token = app.token_for(&app.user("carol"));

    // Alice registers two devices, Bob one, Carol none
    app.subscribe(&alice_token, &app.endpoint()).await;
    app.subscribe(&alice_token, &app.endpoint()).await;
    app.subscribe(&bob_token, &app.endpoint()).await;

    let resp = app
        .client
        .get(app.url("/push-subscriptions/stats"))
        .bearer_auth(&alice_token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["active_subjects"], 2);
    assert_eq!(json["total_subscriptions"], 3);
    assert_eq!(json["subscribed"], true);

    let resp = app
        .client
        .get(app.url("/push-subscriptions/stats"))
        .bearer_auth(&carol_token)
        .send()
        .await
        .unwrap();
    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["subscribed"], false);
}
