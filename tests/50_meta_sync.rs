mod common;

use anyhow::Result;
use axum::http::StatusCode;
use chrono::{Duration, Utc};
use dashboard_api::config::AncestorPolicy;
use dashboard_api::database::DocumentStore;
use serde_json::json;

use common::{error_code, obj, TestApp};

const BMS: &str = "meta_business_managers";

#[tokio::test]
async fn sync_without_access_token_is_a_failed_precondition() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin();

    let (status, body) = app.post("/api/meta/sync", Some(&admin), json!({"level": "BM"})).await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED);
    assert_eq!(error_code(&body), "failed-precondition");
    assert!(app.platform.requests.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn business_managers_are_mirrored_by_sanitized_name() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin();

    // Token stored through the API, then used for the listing
    let (status, body) = app
        .put("/api/meta/token", Some(&admin), json!({"token": "long-lived", "expiresIn": 3600}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["version"], 1);

    app.platform
        .answer("me/businesses", json!([{"id": "111", "name": "Acme Co"}, {"id": "222", "name": "Beta/Labs"}]));
    let (status, body) = app.post("/api/meta/sync", Some(&admin), json!({"level": "BM"})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["level"], "BM");
    assert_eq!(body["count"], 2);

    let acme = app.store.get(BMS, "Acme_Co").await?.expect("mirrored BM");
    assert_eq!(acme.data["id"], "111");
    assert_eq!(app.store.count(BMS).await, 2);
    assert_eq!(
        app.platform.last_request().map(|r| r.access_token),
        Some("long-lived".to_string())
    );

    // An empty relisting empties the mirror
    app.platform.answer("me/businesses", json!([]));
    let (status, body) = app.post("/api/meta/sync", Some(&admin), json!({"level": "BM"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
    assert_eq!(app.store.count(BMS).await, 0);
    Ok(())
}

#[tokio::test]
async fn ad_accounts_replace_previous_children() -> Result<()> {
    let app = TestApp::new();
    app.seed_access_token().await;
    let admin = app.admin();

    app.platform.answer("me/businesses", json!([{"id": "111", "name": "Acme Co"}]));
    app.post("/api/meta/sync", Some(&admin), json!({"level": "BM"})).await;

    let accounts = format!("{BMS}/Acme_Co/ad_accounts");
    app.store
        .set(&accounts, "Stale", obj(json!({"id": "act_0", "name": "Stale"})))
        .await?;

    app.platform
        .answer("111/owned_ad_accounts", json!([{"id": "act_1", "name": "Main"}]));
    let (status, body) = app
        .post("/api/meta/sync", Some(&admin), json!({"level": "AD_ACCOUNT", "bmId": "111"}))
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["count"], 1);

    assert!(app.store.get(&accounts, "Stale").await?.is_none());
    assert!(app.store.get(&accounts, "Main").await?.is_some());
    Ok(())
}

#[tokio::test]
async fn name_collisions_are_reported() -> Result<()> {
    let app = TestApp::new();
    app.seed_access_token().await;
    let admin = app.admin();

    app.platform.answer(
        "me/businesses",
        json!([{"id": "1", "name": "Acme Co"}, {"id": "2", "name": "Acme.Co"}, {"id": "3"}]),
    );
    let (status, body) = app.post("/api/meta/sync", Some(&admin), json!({"level": "BM"})).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["skipped"], 1);
    assert_eq!(
        body["collisions"],
        json!([{"key": "Acme_Co", "overwrittenId": "1", "winningId": "2"}])
    );
    assert_eq!(app.store.count(BMS).await, 1);
    Ok(())
}

#[tokio::test]
async fn missing_ancestor_is_not_found() -> Result<()> {
    let app = TestApp::new();
    app.seed_access_token().await;
    let admin = app.admin();

    let (status, body) = app
        .post("/api/meta/sync", Some(&admin), json!({"level": "AD_ACCOUNT", "bmId": "999"}))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(error_code(&body), "not-found");

    app.platform.answer("me/businesses", json!([{"id": "111", "name": "Acme Co"}]));
    app.post("/api/meta/sync", Some(&admin), json!({"level": "BM"})).await;
    let (status, _) = app
        .post(
            "/api/meta/sync",
            Some(&admin),
            json!({"level": "CAMPAIGN", "bmId": "111", "adAccountKey": "Nope"}),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn ambiguous_ancestor_can_be_rejected() -> Result<()> {
    let app = TestApp::with_config(|config| config.meta.ancestor_policy = AncestorPolicy::Reject);
    app.seed_access_token().await;
    let admin = app.admin();

    app.store.set(BMS, "Acme", obj(json!({"id": "111", "name": "Acme"}))).await?;
    app.store.set(BMS, "Acme_old", obj(json!({"id": "111", "name": "Acme old"}))).await?;

    let (status, body) = app
        .post("/api/meta/sync", Some(&admin), json!({"level": "AD_ACCOUNT", "bmId": "111"}))
        .await;
    assert_eq!(status, StatusCode::PRECONDITION_FAILED, "{body}");
    assert!(app.platform.requests.lock().unwrap().is_empty());
    Ok(())
}

#[tokio::test]
async fn request_arguments_are_validated() -> Result<()> {
    let app = TestApp::new();
    app.seed_access_token().await;
    let admin = app.admin();

    let (status, body) = app.post("/api/meta/sync", Some(&admin), json!({"level": "ADS"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid-argument");

    let (status, body) = app.post("/api/meta/sync", Some(&admin), json!({"level": "CAMPAIGN", "bmId": "1"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"].as_str().unwrap_or("").contains("adAccountKey"));

    let (status, body) = app
        .post(
            "/api/meta/sync",
            Some(&admin),
            json!({"level": "INSIGHTS", "bmId": "1", "adAccountKey": "Main", "date": "2024-13-40"}),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(error_code(&body), "invalid-argument");
    Ok(())
}

#[tokio::test]
async fn insights_default_to_yesterday() -> Result<()> {
    let app = TestApp::new();
    app.seed_access_token().await;
    let admin = app.admin();

    app.platform.answer("me/businesses", json!([{"id": "111", "name": "Acme Co"}]));
    app.platform
        .answer("111/owned_ad_accounts", json!([{"id": "act_1", "name": "Main"}]));
    app.platform.answer(
        "act_1/insights",
        json!([{"spend": "12.5", "impressions": "1000"}, {"spend": "7.5", "impressions": "500"}]),
    );
    app.post("/api/meta/sync", Some(&admin), json!({"level": "BM"})).await;
    app.post("/api/meta/sync", Some(&admin), json!({"level": "AD_ACCOUNT", "bmId": "111"}))
        .await;

    let before = (Utc::now() - Duration::days(1)).format("%Y-%m-%d").to_string();
    let (status, body) = app
        .post(
            "/api/meta/sync",
            Some(&admin),
            json!({"level": "INSIGHTS", "bmId": "111", "adAccountKey": "Main"}),
        )
        .await;
    let after = (Utc::now() - Duration::days(1)).format("%Y-%m-%d").to_string();
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["count"], 2);

    let insights = format!("{BMS}/Acme_Co/ad_accounts/Main/insights");
    let doc = match app.store.get(&insights, &before).await? {
        Some(doc) => doc,
        None => app.store.get(&insights, &after).await?.expect("insights document"),
    };
    assert_eq!(doc.data["spend"], json!(20));
    assert_eq!(doc.data["impressions"], json!(1500));
    assert_eq!(doc.data["adAccountId"], "act_1");
    Ok(())
}

#[tokio::test]
async fn token_status_never_returns_the_token() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin();

    let (status, body) = app.get("/api/meta/token", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["configured"], false);

    app.put("/api/meta/token", Some(&admin), json!({"token": "secret-token-value"}))
        .await;
    let (status, body) = app
        .put("/api/meta/token", Some(&admin), json!({"token": "secret-token-value-2"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], 2);

    let (status, body) = app.get("/api/meta/token", Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["configured"], true);
    assert_eq!(body["needsRefresh"], false);
    assert!(!body.to_string().contains("secret-token-value"));

    let (status, _) = app.put("/api/meta/token", Some(&admin), json!({"token": "  "})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn out_of_range_token_lifetime_is_invalid_argument() -> Result<()> {
    let app = TestApp::new();
    let admin = app.admin();

    let (status, body) = app
        .put("/api/meta/token", Some(&admin), json!({"token": "t", "expiresIn": i64::MAX}))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "{body}");
    assert_eq!(error_code(&body), "invalid-argument");

    let (_, body) = app.get("/api/meta/token", Some(&admin)).await;
    assert_eq!(body["configured"], false);
    Ok(())
}

#[tokio::test]
async fn platform_failure_is_internal_and_keeps_the_mirror() -> Result<()> {
    let app = TestApp::new();
    app.seed_access_token().await;
    let admin = app.admin();

    app.platform.answer("me/businesses", json!([{"id": "111", "name": "Acme Co"}]));
    app.post("/api/meta/sync", Some(&admin), json!({"level": "BM"})).await;

    let accounts = format!("{BMS}/Acme_Co/ad_accounts");
    app.store
        .set(&accounts, "Main", obj(json!({"id": "act_1", "name": "Main"})))
        .await?;
    app.store
        .set(&accounts, "Backup", obj(json!({"id": "act_2", "name": "Backup"})))
        .await?;

    // No scripted listing for 111/owned_ad_accounts: the Graph call errors
    let (status, body) = app
        .post("/api/meta/sync", Some(&admin), json!({"level": "AD_ACCOUNT", "bmId": "111"}))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{body}");
    assert_eq!(error_code(&body), "internal");

    assert_eq!(app.store.count(&accounts).await, 2);
    assert!(app.store.get(&accounts, "Main").await?.is_some());
    assert_eq!(
        app.platform.last_request().map(|r| r.path),
        Some("111/owned_ad_accounts".to_string())
    );
    Ok(())
}
