//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use chrono::Utc;
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use eventhub_api::{AppState, build_app};
use eventhub_cache::CacheManager;
use eventhub_core::config::AppConfig;
use eventhub_database::StoreManager;

/// Test application context
pub struct TestApp {
    /// The Axum router for making test requests
    pub router: Router,
    /// Application config
    pub config: AppConfig,
}

impl TestApp {
    /// Create a new test application over an in-memory store and cache.
    pub async fn new() -> Self {
        let mut config = AppConfig::default();
        config.database.provider = "memory".to_string();
        config.database.lock_timeout_ms = 2000;
        config.cache.provider = "memory".to_string();
        config.auth.jwt_secret = "integration-test-secret".to_string();
        config.logging.format = "pretty".to_string();

        let stores = StoreManager::memory(Duration::from_millis(config.database.lock_timeout_ms));
        let cache = Arc::new(
            CacheManager::new(&config.cache)
                .await
                .expect("Failed to init cache"),
        );

        let state = AppState::new(config.clone(), stores, cache);
        Self {
            router: build_app(state),
            config,
        }
    }

    /// Sign up a user and return `(token, user_id)`.
    pub async fn register_user(&self, name: &str, role: &str) -> (String, Uuid) {
        let response = self
            .request(
                "POST",
                "/api/auth/register",
                Some(json!({
                    "name": name,
                    "email": format!("{name}@example.com"),
                    "password": "password123",
                    "role": role,
                })),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);

        let data = &response.body["data"];
        let token = data["token"].as_str().expect("token").to_string();
        let user_id = data["user"]["id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("user id");
        (token, user_id)
    }

    /// Create an event as `admin_token` and return its id.
    pub async fn create_event(&self, admin_token: &str, title: &str, seats: i32) -> Uuid {
        let response = self
            .request(
                "POST",
                "/api/events",
                Some(event_body(title, seats)),
                Some(admin_token),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
        response.body["data"]["id"]
            .as_str()
            .and_then(|s| Uuid::parse_str(s).ok())
            .expect("event id")
    }

    /// Current seat count as served by `GET /api/events/{id}`.
    pub async fn available_seats(&self, event_id: Uuid) -> i64 {
        let response = self
            .request("GET", &format!("/api/events/{event_id}"), None, None)
            .await;
        assert_eq!(response.status, StatusCode::OK);
        response.body["data"]["available_seats"]
            .as_i64()
            .expect("available_seats")
    }

    /// Send a request to the router
    pub async fn request(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        self.request_with_headers(method, path, body, token, &[]).await
    }

    /// Send a request with extra headers
    pub async fn request_with_headers(
        &self,
        method: &str,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        let mut req = Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json");

        if let Some(token) = token {
            req = req.header("Authorization", format!("Bearer {token}"));
        }
        for (name, value) in headers {
            req = req.header(*name, *value);
        }

        let req = req
            .body(Body::from(body_str))
            .expect("Failed to build request");

        let response = self
            .router
            .clone()
            .oneshot(req)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse {
            status,
            headers,
            body,
        }
    }
}

/// A valid create-event body for an event three days out.
pub fn event_body(title: &str, seats: i32) -> Value {
    json!({
        "title": title,
        "description": "An evening of music",
        "date": (Utc::now() + chrono::Duration::days(3)).to_rfc3339(),
        "venue": "Main Hall",
        "total_seats": seats,
    })
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Response headers
    pub headers: HeaderMap,
    /// Parsed JSON body
    pub body: Value,
}
