use axum::{extract::State, response::IntoResponse};
use serde::Serialize;

use crate::{
    error::Result,
    extract::JsonBody,
    models::user::{AccountView, SessionUser},
    response::Reply,
    services::auth as auth_service,
    state::AppState,
    validation::users::{LoginRequest, RegisterRequest},
};

/// The response payload for a registration.
#[derive(Serialize)]
pub struct RegisterResponse {
    pub message: &'static str,
    pub user: AccountView,
}

/// The response payload for a login.
#[derive(Serialize)]
pub struct LoginResponse {
    pub message: &'static str,
    pub token: String,
    pub user: SessionUser,
}

/// Handles user registration.
#[axum::debug_handler]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!("📝 Register attempt for nick: {}", payload.nick);

    let user = auth_service::register(&state, payload).await?;

    Ok(Reply::created(RegisterResponse {
        message: "User registered",
        user: user.account(),
    }))
}

/// Handles user login.
#[axum::debug_handler]
pub async fn login(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse> {
    tracing::info!("🔐 Login attempt for: {}", payload.email);

    let (token, user) = auth_service::login(&state, payload).await?;

    Ok(Reply::created(LoginResponse {
        message: "Logged in",
        token,
        user: user.session(),
    }))
}
