#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use checkin_server::config::ScanPolicy;
use checkin_server::routes::create_routes;
use checkin_server::services::auth::ensure_user;
use checkin_server::state::AppState;
use checkin_server::store::MemoryStore;

pub const STAFF_EMAIL: &str = "staff@example.com";
pub const STAFF_PASSWORD: &str = "correct horse";
pub const KIOSK_ORIGIN: &str = "https://gate.example";

pub struct TestApp {
    pub store: Arc<MemoryStore>,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_policy(ScanPolicy::default())
    }

    pub fn with_policy(policy: ScanPolicy) -> Self {
        let store = Arc::new(MemoryStore::new());
        let state = AppState::new(store.clone(), policy, Duration::from_secs(3600));

        Self {
            store,
            router: create_routes(state, &[KIOSK_ORIGIN.to_string()]),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body)
    }

    pub async fn post_json(&self, uri: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(Method::GET).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    pub async fn scan(&self, code: &str) -> (StatusCode, Value) {
        self.post_json("/scan", serde_json::json!({ "code": code }), None)
            .await
    }

    /// Registers the staff account (bcrypt cost kept low) and signs in.
    pub async fn staff_token(&self) -> String {
        ensure_user(&*self.store, STAFF_EMAIL, "Staff", STAFF_PASSWORD, 4)
            .await
            .unwrap();

        let (status, body) = self
            .post_json(
                "/auth/login",
                serde_json::json!({ "email": STAFF_EMAIL, "password": STAFF_PASSWORD }),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {body}");

        body["token"].as_str().unwrap().to_string()
    }
}
