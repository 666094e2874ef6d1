mod common;

use anyhow::Result;
use axum::http::StatusCode;
use dashboard_api::auth::Role;
use serde_json::json;

use common::{error_code, TestApp};

/// Company with one owner holding a push token and one member without.
async fn company_with_users(app: &TestApp) -> String {
    let id = app.create_company("Acme", None).await;
    let owner = app.token("boss", &id, Role::Owner);
    for user in [
        json!({"email": "ana@acme.com", "name": "Ana", "role": "owner", "pushToken": "ExpoPushToken[ana]"}),
        json!({"email": "bob@acme.com", "name": "Bob", "role": "member"}),
    ] {
        let (status, _) = app.post(&format!("/api/companies/{id}/users"), Some(&owner), user).await;
        assert_eq!(status, StatusCode::CREATED);
    }
    id
}

#[tokio::test]
async fn captured_lead_reaches_devices_through_the_queue() -> Result<()> {
    let app = TestApp::new();
    let id = company_with_users(&app).await;

    app.post(&format!("/public/companies/{id}/leads"), None, json!({"name": "Carla", "source": "ads"}))
        .await;
    let published = app.queue.sent.lock().unwrap()[0].clone();

    // Relay the published message the way the queue would
    let (status, body) = app
        .post("/internal/queue", Some(&app.admin()), json!({"body": published.body}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["kind"], "lead.created");
    assert_eq!(body["recipients"], 1);
    assert_eq!(body["delivered"], 1);

    let pushed = app.push.sent.lock().unwrap();
    assert_eq!(pushed.len(), 1);
    assert_eq!(pushed[0].to, "ExpoPushToken[ana]");
    assert_eq!(pushed[0].title, "New lead");
    assert_eq!(pushed[0].body, "Carla via ads");
    Ok(())
}

#[tokio::test]
async fn inbound_message_reaches_devices_through_the_queue() -> Result<()> {
    let app = TestApp::new();
    let id = company_with_users(&app).await;

    app.post(
        &format!("/webhooks/whatsapp/{id}"),
        None,
        json!({"type": "ReceivedCallback", "phone": "5511", "senderName": "Dora", "text": {"message": "bom dia"}}),
    )
    .await;
    let published = app.queue.sent.lock().unwrap()[0].clone();

    let (status, _) = app
        .post("/internal/queue", Some(&app.admin()), json!({"body": published.body}))
        .await;
    assert_eq!(status, StatusCode::OK);

    let pushed = app.push.sent.lock().unwrap();
    assert_eq!(pushed[0].title, "Dora");
    assert_eq!(pushed[0].body, "bom dia");
    Ok(())
}

#[tokio::test]
async fn unknown_kind_is_invalid_argument() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/internal/queue",
            Some(&app.admin()),
            json!({"body": {"kind": "invoice.paid", "companyId": "c1"}}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid-argument");
    assert!(app.push.sent.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn lead_message_for_missing_lead_is_not_found() -> Result<()> {
    let app = TestApp::new();

    let (status, body) = app
        .post(
            "/internal/queue",
            Some(&app.admin()),
            json!({"body": {"kind": "lead.created", "companyId": "c1", "leadId": "gone"}}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "not-found");
    Ok(())
}
