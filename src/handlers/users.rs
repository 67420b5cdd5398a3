use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect},
    Extension,
};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::Result,
    extract::{read_upload, JsonBody, PageQuery},
    models::{
        claims::Claims,
        follow::{FollowAnnotation, RelationshipAnnotation},
        page::{PageMeta, DEFAULT_USER_PAGE_SIZE},
        user::{AccountView, PublicUser},
    },
    response::Reply,
    services::users as user_service,
    state::AppState,
    validation::users::{parse_id, UpdateUserRequest},
};

#[derive(Serialize)]
pub struct ProfileResponse {
    pub user: PublicUser,
    #[serde(rename = "followInfo")]
    pub follow_info: RelationshipAnnotation,
}

#[derive(Serialize)]
pub struct UserListResponse {
    pub users: Vec<PublicUser>,
    #[serde(flatten)]
    pub meta: PageMeta,
    #[serde(flatten)]
    pub follows: FollowAnnotation,
}

#[derive(Serialize)]
pub struct AccountResponse {
    pub message: &'static str,
    pub user: AccountView,
}

#[derive(Serialize)]
pub struct AvatarResponse {
    pub user: AccountView,
    pub file: String,
}

/// Returns the public profile of a user.
#[axum::debug_handler]
pub async fn profile(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_id(&id, "user")?;
    let (user, follow_info) = user_service::profile(&state, claims.sub, id).await?;
    Ok(Reply::ok(ProfileResponse { user, follow_info }))
}

async fn list_users(
    state: AppState,
    claims: Claims,
    page: Option<String>,
    query: PageQuery,
) -> Result<Reply<UserListResponse>> {
    let request = query.request(page.as_deref(), DEFAULT_USER_PAGE_SIZE);
    let (page, follows) = user_service::list(&state, claims.sub, request).await?;
    Ok(Reply::ok(UserListResponse {
        users: page.items,
        meta: page.meta,
        follows,
    }))
}

/// Lists users, first page.
#[axum::debug_handler]
pub async fn list(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    list_users(state, claims, None, query).await
}

/// Lists users, page taken from the path.
#[axum::debug_handler]
pub async fn list_page(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(page): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    list_users(state, claims, Some(page), query).await
}

/// Updates the caller's profile.
#[axum::debug_handler]
pub async fn update(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> Result<impl IntoResponse> {
    let user = user_service::update(&state, claims.sub, payload).await?;
    Ok(Reply::ok(AccountResponse {
        message: "Profile updated",
        user: user.account(),
    }))
}

/// Replaces the caller's avatar with the uploaded image.
#[axum::debug_handler]
pub async fn upload_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    tracing::info!("📤 Avatar upload from user: {}", claims.sub);
    let upload = read_upload(multipart).await?;
    let user = user_service::upload_avatar(&state, claims.sub, upload).await?;
    Ok(Reply::ok(AvatarResponse {
        file: user.image.clone(),
        user: user.account(),
    }))
}

/// Redirects to a user's avatar.
#[axum::debug_handler]
pub async fn avatar(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_id(&id, "user")?;
    let url = user_service::avatar_url(&state, id).await?;
    Ok(Redirect::temporary(&url))
}

async fn user_counters(state: AppState, user: Uuid) -> Result<Reply<user_service::Counters>> {
    Ok(Reply::ok(user_service::counters(&state, user).await?))
}

/// Counters of the caller.
#[axum::debug_handler]
pub async fn counters(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse> {
    user_counters(state, claims.sub).await
}

/// Counters of the user in the path.
#[axum::debug_handler]
pub async fn counters_of(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    user_counters(state, parse_id(&id, "user")?).await
}
