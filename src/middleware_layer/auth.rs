use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::{
    error::{AppError, AuthError},
    services::auth::verify_token,
    state::AppState,
};

/// Extracts the raw token from the `Authorization` header.
///
/// Clients send it bare, quoted, or as `Bearer <token>`.
///
/// # Arguments
///
/// * `headers` - The request headers.
///
/// # Returns
///
/// An `Option` containing the token if the header is present and not empty.
fn extract_token(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let unquoted = raw.trim().trim_matches(|c| c == '"' || c == '\'');
    let token = match unquoted.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest,
        _ if unquoted.eq_ignore_ascii_case("bearer") => "",
        _ => unquoted,
    }
    .trim();

    (!token.is_empty()).then(|| token.to_string())
}

/// A middleware that requires a valid session token.
///
/// On success the decoded `Claims` are inserted into the request extensions.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `request` - The incoming request.
/// * `next` - The next middleware in the chain.
///
/// # Returns
///
/// A `Response` or an `AppError::Auth`.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    tracing::debug!("🔐 Checking authentication...");

    let token = extract_token(request.headers()).ok_or_else(|| {
        tracing::warn!("❌ No Authorization header");
        AuthError::MissingHeader
    })?;

    let claims = verify_token(&state.config.jwt_secret, &token, chrono::Utc::now())?;

    tracing::debug!("✅ User authenticated: {}", claims.sub);
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}
