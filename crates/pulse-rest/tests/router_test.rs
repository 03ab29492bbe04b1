//! End-to-end router tests over an in-memory SQLite database.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use http_body_util::BodyExt;
use pulse_config::ServerConfig;
use pulse_core::{CacheKey, ManualClock};
use pulse_jobs::{JobRecorder, RefreshJob};
use pulse_repository::{DatabasePool, DatabasePoolInterface};
use pulse_rest::middleware::AuthMiddlewareState;
use pulse_rest::{create_router, AppState};
use pulse_service::{CacheService, CacheStore};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    cache: Arc<CacheStore>,
    clock: Arc<ManualClock>,
    pool: DatabasePool,
}

async fn create_test_app(secret: Option<&str>) -> TestApp {
    let pool = DatabasePool::in_memory().await.unwrap();
    let repositories = pool.repositories();
    let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
    let cache = Arc::new(CacheStore::new(repositories.cache.clone(), clock.clone()));
    let recorder = JobRecorder::from_repositories(&repositories, clock.clone());
    let refresh_job = RefreshJob::new(cache.clone(), recorder);
    let state = AppState::new(cache.clone(), refresh_job, Arc::new(pool.clone()));
    let router = create_router(state, &ServerConfig::default(), AuthMiddlewareState::new(secret));
    TestApp {
        router,
        cache,
        clock,
        pool,
    }
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

async fn seed(app: &TestApp, key: &str, ttl_secs: u64) {
    app.cache
        .set(&CacheKey::new(key).unwrap(), json!({"key": key}), Duration::from_secs(ttl_secs))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_health_endpoints_are_public() {
    let app = create_test_app(Some(SECRET)).await;

    for uri in ["/health", "/ready", "/live", "/api-docs/openapi.json"] {
        let (status, _) = send(&app, request(Method::GET, uri, None, None)).await;
        assert_eq!(status, StatusCode::OK, "{uri}");
    }
}

#[tokio::test]
async fn test_ready_reports_unavailable_database() {
    let app = create_test_app(None).await;
    app.pool.close().await;

    let (status, body) = send(&app, request(Method::GET, "/ready", None, None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["status"], "unavailable");
}

#[tokio::test]
async fn test_request_id_is_returned() {
    let app = create_test_app(None).await;
    let response = app
        .router
        .clone()
        .oneshot(request(Method::GET, "/health", None, None))
        .await
        .unwrap();
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_refresh_requires_secret() {
    let app = create_test_app(Some(SECRET)).await;

    let (status, body) = send(&app, request(Method::POST, "/api/v1/cache/refresh", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let (status, _) = send(&app, request(Method::POST, "/api/v1/cache/refresh", Some("wrong"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, request(Method::POST, "/api/v1/cache/refresh", Some(SECRET), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
}

#[tokio::test]
async fn test_refresh_without_configured_secret_is_open() {
    let app = create_test_app(None).await;
    let (status, _) = send(&app, request(Method::GET, "/api/v1/cache/refresh", None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_refresh_reports_counts_and_is_logged() {
    let app = create_test_app(Some(SECRET)).await;
    seed(&app, "metrics:github:2024-01", 10).await;
    seed(&app, "social:twitter:2024-01", 3600).await;
    app.clock.advance(ChronoDuration::seconds(30));

    let (status, body) = send(&app, request(Method::GET, "/api/v1/cache/refresh", Some(SECRET), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!({"cleaned": 1, "invalidated": 1}));

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/v1/jobs/runs?job_name=refresh_cache", Some(SECRET), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let runs = body["data"].as_array().unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0]["status"], "success");
    assert_eq!(runs[0]["message"], "Cleaned 1 expired entries, invalidated 1 entries");

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/v1/jobs/refresh_cache/state", Some(SECRET), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["phase"], "succeeded");
}

#[tokio::test]
async fn test_unknown_job_state_is_not_found() {
    let app = create_test_app(None).await;
    let (status, body) = send(&app, request(Method::GET, "/api/v1/jobs/never_ran/state", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_job_states_lists_every_job() {
    let app = create_test_app(Some(SECRET)).await;

    let (status, body) = send(&app, request(Method::GET, "/api/v1/jobs/states", Some(SECRET), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));

    let (status, _) = send(&app, request(Method::POST, "/api/v1/cache/refresh", Some(SECRET), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(&app, request(Method::GET, "/api/v1/jobs/states", Some(SECRET), None)).await;
    assert_eq!(status, StatusCode::OK);
    let states = body["data"].as_array().unwrap();
    assert_eq!(states.len(), 1);
    assert_eq!(states[0]["job_name"], "refresh_cache");
    assert_eq!(states[0]["phase"], "succeeded");

    let (status, _) = send(&app, request(Method::GET, "/api/v1/jobs/states", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_cleanup_endpoint() {
    let app = create_test_app(None).await;
    seed(&app, "metrics:a", 60).await;
    seed(&app, "metrics:b", 0).await;

    let (status, body) = send(&app, request(Method::POST, "/api/v1/cache/cleanup", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], 1);
}

#[tokio::test]
async fn test_invalidate_by_prefix() {
    let app = create_test_app(None).await;
    seed(&app, "metrics:a", 60).await;
    seed(&app, "metrics:b", 60).await;
    seed(&app, "social:foo", 60).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/cache/invalidate",
            None,
            Some(json!({"mode": "prefix", "key": "metrics:"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], 2);

    let (status, _) = send(&app, request(Method::GET, "/api/v1/cache/entries/social:foo", None, None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_invalidate_requires_key_for_exact_and_prefix() {
    let app = create_test_app(None).await;

    for mode in ["exact", "prefix"] {
        let (status, body) = send(
            &app,
            request(Method::POST, "/api/v1/cache/invalidate", None, Some(json!({"mode": mode}))),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{mode}");
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    let (status, body) = send(
        &app,
        request(Method::POST, "/api/v1/cache/invalidate", None, Some(json!({"mode": "all"}))),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["removed"], 0);
}

#[tokio::test]
async fn test_entry_lookup_honours_expiry() {
    let app = create_test_app(None).await;
    seed(&app, "metrics:github:2024-01", 60).await;

    let (status, body) = send(
        &app,
        request(Method::GET, "/api/v1/cache/entries/metrics:github:2024-01", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["payload"], json!({"key": "metrics:github:2024-01"}));

    app.clock.advance(ChronoDuration::seconds(60));
    let (status, _) = send(
        &app,
        request(Method::GET, "/api/v1/cache/entries/metrics:github:2024-01", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, request(Method::GET, "/api/v1/cache/entries/never:set", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
