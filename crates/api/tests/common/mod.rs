#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

use backoffice_api::auth::jwt::{generate_access_token, JwtConfig};
use backoffice_api::auth::password::hash_password;
use backoffice_api::config::ServerConfig;
use backoffice_api::router::build_app_router;
use backoffice_api::state::AppState;
use backoffice_db::models::business::{Business, CreateBusiness};
use backoffice_db::models::user::{CreateUser, User};
use backoffice_db::repositories::{BusinessRepo, UserRepo};
use backoffice_events::{EventBus, MessageSender, TelegramConfig, TelegramError};

pub const TEST_PASSWORD: &str = "Correct-horse-42";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

/// Test `ServerConfig` with safe defaults and a fixed JWT secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "integration-test-secret".to_string(),
            access_token_expiry_mins: 15,
            refresh_token_expiry_days: 7,
        },
        telegram: TelegramConfig {
            bot_token: Some("test-token".to_string()),
            api_base: "http://127.0.0.1:9".to_string(),
        },
        telegram_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        sweep_interval_secs: 3600,
        expiry_warning_days: 7,
        access_log_enabled: true,
        access_log_retention_days: 90,
        admin_bootstrap: None,
    }
}

/// Records outbound messages instead of calling Telegram.
#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<(i64, String)>>,
}

impl RecordingSender {
    pub fn messages(&self) -> Vec<(i64, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl MessageSender for RecordingSender {
    fn is_enabled(&self) -> bool {
        true
    }

    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), TelegramError> {
        self.sent.lock().unwrap().push((chat_id, text.to_string()));
        Ok(())
    }
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub sender: Arc<RecordingSender>,
}

impl TestApp {
    /// A fresh router over the same state; `oneshot` consumes it.
    pub fn app(&self) -> Router {
        self.router.clone()
    }
}

/// Full router with the production middleware stack and a recording sender.
pub fn build_test_app(pool: PgPool) -> TestApp {
    let config = test_config();
    let sender = Arc::new(RecordingSender::default());
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::new(EventBus::default()),
        telegram: sender.clone(),
    };
    TestApp {
        router: build_app_router(state.clone(), &config),
        state,
        sender,
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub async fn create_user(
    pool: &PgPool,
    username: &str,
    role: &str,
    business_id: Option<i64>,
    class_id: Option<i64>,
) -> User {
    let role_id = UserRepo::role_id_by_name(pool, role)
        .await
        .unwrap()
        .expect("role should be seeded");
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@test.com"),
            password_hash: hash_password(TEST_PASSWORD).unwrap(),
            role_id,
            full_name: Some(format!("{username} test")),
            phone: None,
            business_id,
            class_id,
        },
    )
    .await
    .expect("user creation should succeed")
}

pub async fn create_business(pool: &PgPool, subdomain: &str) -> Business {
    BusinessRepo::create(
        pool,
        &CreateBusiness {
            name: format!("{subdomain} kitchen"),
            subdomain: subdomain.to_string(),
            phone: None,
            address: None,
            description: None,
        },
    )
    .await
    .expect("business creation should succeed")
}

/// Access token for an existing user, signed with the test secret.
pub fn token_for(user: &User) -> String {
    generate_access_token(user.id, &user.role, user.business_id, &test_config().jwt).unwrap()
}

/// Create a user and return it with a ready-to-use access token.
pub async fn user_with_token(
    pool: &PgPool,
    username: &str,
    role: &str,
    business_id: Option<i64>,
) -> (User, String) {
    let user = create_user(pool, username, role, business_id, None).await;
    let token = token_for(&user);
    (user, token)
}

// ---------------------------------------------------------------------------
// Request helpers
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn post_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), None).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    token: &str,
    body: serde_json::Value,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}
