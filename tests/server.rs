//! Serves the router on an ephemeral port and talks to it over real HTTP.

use chrono::{DateTime, Utc};
use crm_app::{build_app, models::HealthResponse, Environment, Settings};
use serde_json::Value;
use tokio::net::TcpListener;

async fn spawn_server(settings: Settings) -> String {
    let app = build_app(settings).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

#[tokio::test]
async fn health_endpoint_over_http() {
    let started: DateTime<Utc> = Utc::now();
    let settings = Settings::from_lookup(|name| match name {
        "ENVIRONMENT" => Some("Testing".into()),
        "APP_NAME" => Some("crm-e2e".into()),
        _ => None,
    })
    .unwrap();
    let base = spawn_server(settings).await;

    let resp = reqwest::get(format!("{base}/health")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    let body: HealthResponse = resp.json().await.unwrap();
    assert_eq!(body.status, "healthy");
    assert_eq!(body.service, "crm-e2e");
    assert_eq!(body.environment, Environment::Testing);
    assert!(body.timestamp >= started);
}

#[tokio::test]
async fn root_endpoint_over_http() {
    let base = spawn_server(Settings::default()).await;

    let body: Value = reqwest::get(format!("{base}/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(body["message"], "Welcome to crm-app");
    assert_eq!(body["environment"], "development");
    assert_eq!(body["docs"], "/api/v1/docs");
    assert_eq!(body["health"], "/api/v1/health");

    let advertised = body["health"].as_str().unwrap();
    let resp = reqwest::get(format!("{base}{advertised}")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);

    // the Swagger UI page sits under the trailing slash
    let advertised = body["docs"].as_str().unwrap();
    let resp = reqwest::get(format!("{base}{advertised}/")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn unknown_path_is_not_found() {
    let base = spawn_server(Settings::default()).await;
    let resp = reqwest::get(format!("{base}/customers")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);
}

#[test]
fn testing_environment_resolves_test_database() {
    let with_test_url = Settings::from_lookup(|name| match name {
        "ENVIRONMENT" => Some("testing".into()),
        "DATABASE_URL" => Some("postgres://primary".into()),
        "DATABASE_URL_TEST" => Some("postgres://test".into()),
        _ => None,
    })
    .unwrap();
    assert_eq!(with_test_url.effective_database_url(), "postgres://test");

    let without_test_url = Settings::from_lookup(|name| match name {
        "ENVIRONMENT" => Some("testing".into()),
        "DATABASE_URL" => Some("postgres://primary".into()),
        _ => None,
    })
    .unwrap();
    assert_eq!(without_test_url.effective_database_url(), "postgres://primary");
}
