use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use redis::aio::ConnectionManager;
use sonic_rs::JsonValueTrait;
use std::net::SocketAddr;

use crate::{error::AppError, state::AppState};

/// Registrations allowed per IP in one window.
const REGISTER_ATTEMPTS: i64 = 5;
/// Failed logins allowed per email in one window.
const LOGIN_FAILURES: i64 = 5;
/// Window length in seconds (12 hours).
const WINDOW_SECS: i64 = 43_200;
/// Largest login body inspected for the email.
const LOGIN_BODY_LIMIT: usize = 16 * 1024;

/// Extracts the real IP address from the request extensions.
///
/// # Arguments
///
/// * `req` - The incoming request.
///
/// # Returns
///
/// The IP address as a string, or "unknown" if not found.
fn extract_real_ip(req: &Request<Body>) -> String {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Attempts recorded under `key`. Redis failures count as zero.
async fn attempts(redis: &mut ConnectionManager, key: &str) -> i64 {
    let count: Option<i64> = redis::cmd("GET")
        .arg(key)
        .query_async(redis)
        .await
        .unwrap_or(None);
    count.unwrap_or(0)
}

/// Minutes until `key` expires.
async fn minutes_left(redis: &mut ConnectionManager, key: &str) -> i64 {
    let ttl: Option<i64> = redis::cmd("TTL")
        .arg(key)
        .query_async(redis)
        .await
        .unwrap_or(None);
    ttl.unwrap_or(0).max(0) / 60
}

/// Counts one attempt under `key` and (re)starts its window.
async fn record_attempt(redis: &mut ConnectionManager, key: &str) {
    let _: () = redis::cmd("INCR")
        .arg(key)
        .query_async(redis)
        .await
        .unwrap_or(());

    let _: () = redis::cmd("EXPIRE")
        .arg(key)
        .arg(WINDOW_SECS)
        .query_async(redis)
        .await
        .unwrap_or(());
}

/// A middleware that rate limits user registration per IP.
///
/// Does nothing when Redis is not configured.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `req` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response`, or a 429 once the IP used up its attempts.
pub async fn rate_limit_register(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(mut redis) = state.redis.clone() else {
        return next.run(req).await;
    };

    let ip = extract_real_ip(&req);
    let key = format!("rate_limit:register:{}", ip);

    if attempts(&mut redis, &key).await >= REGISTER_ATTEMPTS {
        tracing::warn!("❌ Registration limit reached for {}", ip);
        return AppError::RateLimitExceeded(format!(
            "Registration limit exceeded. Try again in {} minutes",
            minutes_left(&mut redis, &key).await
        ))
        .into_response();
    }

    record_attempt(&mut redis, &key).await;
    next.run(req).await
}

/// A middleware that rate limits failed logins per email.
///
/// A successful login clears the counter.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `req` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response`, or a 429 once the email used up its attempts.
pub async fn rate_limit_login(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let Some(mut redis) = state.redis.clone() else {
        return next.run(req).await;
    };

    fn extract_email_from_body(body_bytes: &[u8]) -> Option<String> {
        let json = sonic_rs::from_slice::<sonic_rs::Value>(body_bytes).ok()?;
        json.get("email")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().to_lowercase())
    }

    let (parts, body) = req.into_parts();
    let body_bytes = match axum::body::to_bytes(body, LOGIN_BODY_LIMIT).await {
        Ok(bytes) => bytes,
        Err(_) => {
            return AppError::Validation("Login request body is too large".to_string())
                .into_response();
        }
    };

    let email = extract_email_from_body(&body_bytes).unwrap_or_else(|| "unknown".to_string());
    let key = format!("rate_limit:login:{}", email);

    if attempts(&mut redis, &key).await >= LOGIN_FAILURES {
        tracing::warn!("❌ Login limit reached for {}", email);
        return AppError::RateLimitExceeded(format!(
            "Too many failed login attempts. Try again in {} minutes",
            minutes_left(&mut redis, &key).await
        ))
        .into_response();
    }

    let response = next.run(Request::from_parts(parts, Body::from(body_bytes))).await;

    if response.status().is_client_error() {
        record_attempt(&mut redis, &key).await;
    } else if response.status().is_success() {
        let _: () = redis::cmd("DEL")
            .arg(&key)
            .query_async(&mut redis)
            .await
            .unwrap_or(());
    }

    response
}
