mod common;

use anyhow::Result;
use axum::http::StatusCode;
use dashboard_api::auth::Role;
use dashboard_api::database::DocumentStore;
use dashboard_api::sealing;
use serde_json::json;

use common::{error_code, TestApp};

#[tokio::test]
async fn company_credentials_are_sealed_at_rest() -> Result<()> {
    let app = TestApp::new();
    let id = app
        .create_company(
            "  Acme Co  ",
            Some(json!({"instance": "inst-1", "token": "tok-1", "clientToken": "client-1"})),
        )
        .await;

    let stored = app.store.get("companies", &id).await?.expect("company document");
    assert_eq!(stored.data["name"], "Acme Co");
    let sealed = stored.data["whatsapp"]["token"].as_str().expect("sealed token");
    assert_ne!(sealed, "tok-1");
    assert_eq!(sealing::open(sealed)?, "tok-1");

    let admin = app.admin();
    let (status, body) = app.get(&format!("/api/companies/{id}"), Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["whatsapp"]["token"]["configured"], true);
    assert_eq!(body["whatsapp"]["clientToken"]["configured"], true);
    // Only flags leave the server
    assert!(!body.to_string().contains("tok-1"));
    Ok(())
}

#[tokio::test]
async fn company_name_is_validated() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin();

    let (status, body) = app.post("/api/companies", Some(&admin), json!({"name": "   "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid-argument");

    let long = "x".repeat(101);
    let (status, _) = app.post("/api/companies", Some(&admin), json!({"name": long})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let owner = app.token("u1", "c1", Role::Owner);
    let (status, _) = app.post("/api/companies", Some(&owner), json!({"name": "Acme"})).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn companies_are_isolated_by_claim() -> Result<()> {
    let app = TestApp::new();
    let id = app.create_company("Acme", None).await;

    let member = app.token("u1", &id, Role::Member);
    let (status, body) = app.get(&format!("/api/companies/{id}"), Some(&member)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["whatsapp"]["instance"]["configured"], false);

    let outsider = app.token("u2", "other", Role::Owner);
    let (status, body) = app.get(&format!("/api/companies/{id}"), Some(&outsider)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(error_code(&body), "permission-denied");

    let (status, body) = app.get("/api/companies/missing", Some(&app.admin())).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "not-found");
    Ok(())
}

#[tokio::test]
async fn credential_update_replaces_the_whole_triple() -> Result<()> {
    let app = TestApp::new();
    let id = app
        .create_company("Acme", Some(json!({"instance": "i", "token": "t", "clientToken": "c"})))
        .await;

    let owner = app.token("u1", &id, Role::Owner);
    let (status, body) = app
        .put(&format!("/api/companies/{id}/whatsapp"), Some(&owner), json!({"instance": "i2"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["whatsapp"]["instance"]["configured"], true);
    assert_eq!(body["whatsapp"]["token"]["configured"], false);

    let member = app.token("u2", &id, Role::Member);
    let (status, _) = app
        .put(&format!("/api/companies/{id}/whatsapp"), Some(&member), json!({"instance": "i3"}))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn owners_add_users() -> Result<()> {
    let app = TestApp::new();
    let id = app.create_company("Acme", None).await;
    let owner = app.token("u1", &id, Role::Owner);

    let (status, body) = app
        .post(
            &format!("/api/companies/{id}/users"),
            Some(&owner),
            json!({"email": "Ana@Example.com", "name": "Ana", "role": "member", "pushToken": "ExpoPushToken[1]"}),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["email"], "ana@example.com");
    assert_eq!(app.store.count(&format!("companies/{id}/users")).await, 1);

    let (status, _) = app
        .post(
            &format!("/api/companies/{id}/users"),
            Some(&owner),
            json!({"email": "root@example.com", "name": "Root", "role": "admin"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .post(
            &format!("/api/companies/{id}/users"),
            Some(&owner),
            json!({"email": "not-an-email", "name": "Bob", "role": "member"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}
