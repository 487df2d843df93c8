//! Shared fixtures: migrated in-memory SQLite, a recording push provider
//! and request helpers.
#![allow(dead_code)]

use api::services::push::{Notification, PushError, PushProvider};
use api::{build_router, AppState};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use chrono_tz::Tz;
use migration::{Migrator, MigratorTrait};
use serde_json::{json, Value};
use shared::{get_db_connection, Config};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const PASSWORD: &str = "secret123";

/// Records every send; tokens starting with `bad` come back unregistered.
#[derive(Default)]
pub struct RecordingPush {
    pub sent: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl PushProvider for RecordingPush {
    async fn send(&self, token: &str, notification: &Notification) -> Result<String, PushError> {
        self.sent
            .lock()
            .unwrap()
            .push((token.to_string(), notification.title.clone()));
        if token.starts_with("bad") {
            return Err(PushError::new("Requested entity was not found.", Some("UNREGISTERED")));
        }
        Ok(format!("projects/test/messages/{}", token))
    }

    fn name(&self) -> &str {
        "recording"
    }
}

pub fn test_config() -> Config {
    Config {
        database_url: "sqlite::memory:".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        run_migrations: true,
        timezone: Tz::UTC,
        chat_api_key: "test-key".to_string(),
        chat_api_secret: "test-secret".to_string(),
        fcm_project_id: None,
        fcm_access_token: None,
        fcm_endpoint: None,
        push_icon: "/FAVICON.png".to_string(),
        session_ttl_hours: 24,
        password_rounds: 1_000,
        message_tail_limit: 50,
        signal_page_limit: 50,
        realtime_backlog: 64,
        realtime_max_topics: 64,
        admin_emails: vec![ADMIN_EMAIL.to_string()],
        log_json: false,
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub push: Arc<RecordingPush>,
}

pub async fn spawn_app() -> TestApp {
    let config = test_config();
    let db = get_db_connection(&config.database_url).await.unwrap();
    Migrator::up(&db, None).await.unwrap();

    let push = Arc::new(RecordingPush::default());
    let state = AppState::new(db, config, push.clone());
    TestApp {
        router: build_router(state.clone()),
        state,
        push,
    }
}

impl TestApp {
    pub async fn request(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    pub async fn get(&self, uri: &str, token: &str) -> (StatusCode, Value) {
        self.request("GET", uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> (StatusCode, Value) {
        self.request("POST", uri, Some(token), Some(body)).await
    }

    /// Sign up and return the session token.
    pub async fn sign_up(&self, email: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/api/auth/signup",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "signup failed: {}", body);
        body["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn admin(&self) -> String {
        self.sign_up(ADMIN_EMAIL).await
    }

    pub async fn create_signal(&self, token: &str, channel: &str, symbol: &str) -> (StatusCode, Value) {
        self.post(
            &format!("/api/channels/{}/signals", channel),
            token,
            json!({
                "type": "BUY",
                "symbol": symbol,
                "timeframe": "5m",
                "entry": "18000",
                "take_profit": "18100",
                "stop_loss": "17950",
                "description": "Breakout retest"
            }),
        )
        .await
    }
}
