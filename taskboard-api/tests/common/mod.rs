//! Common test utilities for integration tests
//!
//! Every test gets its own in-memory store and router, so tests never share
//! users or tasks. Requests go through the full middleware stack via
//! `tower::Service::call`.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, HeaderMap, Request, StatusCode};
use serde_json::Value;
use taskboard_api::app::{build_router, AppState};
use taskboard_api::config::Config;
use taskboard_shared::auth::jwt::{create_token, Claims, TokenType};
use taskboard_shared::models::user::{CreateUser, User};
use taskboard_shared::store::{MemoryStore, UserStore};
use tower::Service as _;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context: router plus direct access to its store
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
    pub config: Config,
}

/// Status, headers and parsed JSON body (`Null` for empty bodies)
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// All `Set-Cookie` values
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .map(String::from)
            .collect()
    }

    /// Value of the cookie `name` set by this response
    pub fn cookie(&self, name: &str) -> Option<String> {
        let prefix = format!("{}=", name);
        self.set_cookies().into_iter().find_map(|c| {
            c.strip_prefix(&prefix)
                .and_then(|rest| rest.split(';').next())
                .map(String::from)
        })
    }
}

impl TestContext {
    /// Default configuration (CSRF off)
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Configuration with extra environment variables
    pub fn with_env(vars: &[(&str, &str)]) -> Self {
        let mut env: HashMap<String, String> = HashMap::from([
            ("STORAGE_BACKEND".to_string(), "memory".to_string()),
            ("JWT_SECRET".to_string(), JWT_SECRET.to_string()),
        ]);
        for (name, value) in vars {
            env.insert(name.to_string(), value.to_string());
        }

        let config = Config::from_lookup(|name| env.get(name).cloned()).unwrap();
        let store = Arc::new(MemoryStore::new());
        let app = build_router(AppState::new(store.clone(), config.clone()));

        TestContext { store, app, config }
    }

    /// Sends a request through the router
    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().call(request).await.unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn register(&self, email: &str, password: &str) -> TestResponse {
        self.send(json_request(
            "POST",
            "/api/auth/register/",
            None,
            Some(serde_json::json!({ "email": email, "password": password })),
        ))
        .await
    }

    pub async fn login(&self, email: &str, password: &str) -> TestResponse {
        self.send(json_request(
            "POST",
            "/api/auth/token/",
            None,
            Some(serde_json::json!({ "email": email, "password": password })),
        ))
        .await
    }

    /// Creates a user straight in the store and mints an access token for it,
    /// skipping password hashing
    pub async fn user_with_token(&self, email: &str) -> (User, String) {
        let user = self
            .store
            .create_user(CreateUser {
                email: email.to_string(),
                username: None,
                password_hash: "unused".to_string(),
            })
            .await
            .unwrap();
        let token = create_token(&Claims::new(user.id, TokenType::Access), JWT_SECRET).unwrap();
        (user, token)
    }

    /// Creates a task as the holder of `token`, returning its JSON
    pub async fn create_task(&self, token: &str, body: Value) -> Value {
        let response = self
            .send(json_request("POST", "/api/tasks/", Some(token), Some(body)))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "{}", response.body);
        response.body
    }
}

/// Builds a request with an optional bearer token and JSON body
pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}
