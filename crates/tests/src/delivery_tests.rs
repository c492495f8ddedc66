use pushgate_services::push::SendFailure;
use serde_json::Value;

use crate::fixtures::test_app::TestApp;

#[tokio::test]
async fn test_push_requires_authentication() {
    let app = TestApp::spawn().await;

    let resp = app
        .client
        .post(app.url("/push-subscriptions/test"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 401);
}

#[tokio::test]
async fn test_push_reaches_every_device_of_the_caller() {
    let app = TestApp::spawn().await;
    let token = app.token_for(&app.user("alice"));
    let first = app.endpoint();
    let second = app.endpoint();

    app.subscribe(&token, &first).await;
    app.subscribe(&token, &second).await;

    // Another subject's device must not be touched
    let bob_token = app.token_for(&app.user("bob"));
    app.subscribe(&bob_token, &app.endpoint()).await;

    let resp = app
        .client
        .post(app.url("/push-subscriptions/test"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let report: Value = resp.json().await.unwrap();
    assert_eq!(report["delivered"], 2);
    assert_eq!(report["expired"], 0);
    assert_eq!(report["failed"], 0);

    let sent = app.sender.sent_endpoints();
    assert_eq!(sent.len(), 2);
    assert!(sent.contains(&first));
    assert!(sent.contains(&second));
}

#[tokio::test]
async fn test_push_prunes_gone_endpoints() {
    let app = TestApp::spawn().await;
    let token = app.token_for(&app.user("alice"));
    let live = app.endpoint();
    let dead = app.endpoint();

    app.subscribe(&token, &live).await;
    app.subscribe(&token, &dead).await;
    app.sender.fail_with(&dead, vec![SendFailure::EndpointGone]);

    let resp = app
        .client
        .post(app.url("/push-subscriptions/test"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let report: Value = resp.json().await.unwrap();
    assert_eq!(report["delivered"], 1);
    assert_eq!(report["expired"], 1);
    assert_eq!(report["removed"][0], dead);

    let records = app.store.snapshot();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].endpoint, live);
}

#[tokio::test]
async fn test_push_without_subscriptions_reports_nothing() {
    let app = TestApp::spawn().await;
    let token = app.token_for(&app.user("alice"));

    let resp = app
        .client
        .post(app.url("/push-subscriptions/test"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status().as_u16(), 200);

    let report: Value = resp.json().await.unwrap();
    assert_eq!(report["delivered"], 0);
    assert_eq!(report["expired"], 0);
    assert_eq!(report["failed"], 0);
    assert_eq!(report["rejected"], 0);
    assert!(app.sender.sent_endpoints().is_empty());
}

#[tokio::test]
async fn rejected_delivery_lands_in_report_not_status() {
    let app = TestApp::spawn().await;
    let token = app.token_for(&app.user("alice"));
    let endpoint = app.endpoint();

    app.subscribe(&token, &endpoint).await;
    app.sender.fail_with(
        &endpoint,
        vec![SendFailure::Rejected {
            reason: "payload too large".to_string(),
        }],
    );

    let resp = app
        .client
        .post(app.url("/push-subscriptions/test"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    // A per-subscription failure never fails the call
    assert_eq!(resp.status().as_u16(), 200);

    let report: Value = resp.json().await.unwrap();
    assert_eq!(report["rejected"], 1);
    assert_eq!(report["delivered"], 0);

    // The subscription survives: only gone endpoints are pruned
    assert_eq!(app.store.snapshot().len(), 1);
}
