//! Access log layer: one `access_logs` row per routed request.
//!
//! The caller is read from the Bearer token when it validates; anonymous and
//! rejected requests are logged without a user. Rows are written off the
//! request path so a slow insert never delays the response.

use std::net::SocketAddr;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::header::{AUTHORIZATION, USER_AGENT};
use axum::http::{HeaderMap, Request};
use axum::middleware::Next;
use axum::response::Response;
use backoffice_core::types::DbId;
use backoffice_db::models::access_log::CreateAccessLog;
use backoffice_db::repositories::AccessLogRepo;

use crate::auth::jwt::validate_token;
use crate::state::AppState;

const SKIPPED_PATHS: &[&str] = &["/health", "/favicon.ico"];

/// Longest stored query string or user agent, in characters.
const MAX_FIELD_CHARS: usize = 512;

pub async fn record(State(state): State<AppState>, req: Request<Body>, next: Next) -> Response {
    if !state.config.access_log_enabled || is_skipped(req.uri().path()) {
        return next.run(req).await;
    }

    let started = Instant::now();
    let headers = req.headers();
    let (user_id, user_role) = caller(headers, &state).unzip();
    let peer = req.extensions().get::<ConnectInfo<SocketAddr>>().map(|c| c.0);

    let mut entry = CreateAccessLog {
        user_id,
        user_role,
        http_method: req.method().to_string(),
        endpoint: req.uri().path().to_string(),
        query_string: req.uri().query().map(clip),
        ip_address: client_ip(headers, peer),
        user_agent: header_text(headers, USER_AGENT.as_str()).map(clip),
        request_id: header_text(headers, "x-request-id").map(str::to_string),
        status_code: 0,
        response_time_ms: 0,
        error_message: None,
    };

    let response = next.run(req).await;

    let status = response.status();
    entry.status_code = i32::from(status.as_u16());
    entry.response_time_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);
    if status.is_client_error() || status.is_server_error() {
        entry.error_message = Some(format!("HTTP {} error", status.as_u16()));
    }

    let pool = state.pool.clone();
    tokio::spawn(async move {
        if let Err(e) = AccessLogRepo::insert(&pool, &entry).await {
            tracing::warn!(error = %e, endpoint = %entry.endpoint, "Failed to write access log");
        }
    });

    response
}

fn is_skipped(path: &str) -> bool {
    SKIPPED_PATHS.contains(&path)
}

fn caller(headers: &HeaderMap, state: &AppState) -> Option<(DbId, String)> {
    let token = header_text(headers, AUTHORIZATION.as_str())?.strip_prefix("Bearer ")?;
    let claims = validate_token(token.trim(), &state.config.jwt).ok()?;
    Some((claims.sub, claims.role))
}

/// First `X-Forwarded-For` hop, then `X-Real-IP`, then the socket peer.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    header_text(headers, "x-forwarded-for")
        .and_then(|v| v.split(',').next())
        .or_else(|| header_text(headers, "x-real-ip"))
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn clip(value: &str) -> String {
    value.chars().take(MAX_FIELD_CHARS).collect()
}
