use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Extension,
};
use serde::Serialize;

use crate::{
    error::{AppError, Result},
    extract::{JsonBody, PageQuery},
    models::{
        claims::Claims,
        follow::{Follow, FollowAnnotation, FollowCreated, FollowEntry},
        page::{PageMeta, DEFAULT_PAGE_SIZE},
    },
    repositories::follow::Direction,
    response::Reply,
    services::follows as follow_service,
    state::AppState,
    validation::users::{parse_id, FollowRequest},
};

#[derive(Serialize)]
pub struct FollowResponse {
    pub message: &'static str,
    pub follow: FollowCreated,
}

#[derive(Serialize)]
pub struct UnfollowResponse {
    pub message: &'static str,
    pub follow: Follow,
}

#[derive(Serialize)]
pub struct FollowListResponse {
    pub follows: Vec<FollowEntry>,
    #[serde(flatten)]
    pub meta: PageMeta,
    #[serde(flatten)]
    pub annotation: FollowAnnotation,
}

/// Follows the user named in the body.
#[axum::debug_handler]
pub async fn follow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(payload): JsonBody<FollowRequest>,
) -> Result<impl IntoResponse> {
    let target = payload
        .followed_user
        .as_deref()
        .ok_or_else(|| AppError::Validation("followed_user is required".to_string()))?;
    let target = parse_id(target, "user")?;

    let follow = follow_service::follow(&state, claims.sub, target).await?;
    Ok(Reply::created(FollowResponse {
        message: "Follow created",
        follow,
    }))
}

/// Stops following the user in the path.
#[axum::debug_handler]
pub async fn unfollow(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let target = parse_id(&id, "user")?;
    let follow = follow_service::unfollow(&state, claims.sub, target).await?;
    Ok(Reply::ok(UnfollowResponse {
        message: "Follow removed",
        follow,
    }))
}

async fn list_follows(
    state: AppState,
    claims: Claims,
    direction: Direction,
    user: Option<String>,
    page: Option<String>,
    query: PageQuery,
) -> Result<Reply<FollowListResponse>> {
    let user = match user {
        Some(raw) => parse_id(&raw, "user")?,
        None => claims.sub,
    };
    let request = query.request(page.as_deref(), DEFAULT_PAGE_SIZE);

    let page = follow_service::list(&state, user, direction, request).await?;
    let annotation =
        FollowAnnotation::from_lookup(follow_service::summarize(&state, claims.sub).await);

    Ok(Reply::ok(FollowListResponse {
        follows: page.items,
        meta: page.meta,
        annotation,
    }))
}

/// Users the caller follows.
#[axum::debug_handler]
pub async fn following(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    list_follows(state, claims, Direction::Following, None, None, query).await
}

/// Users the user in the path follows.
#[axum::debug_handler]
pub async fn following_of(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    list_follows(state, claims, Direction::Following, Some(id), None, query).await
}

#[axum::debug_handler]
pub async fn following_page(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, page)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    list_follows(state, claims, Direction::Following, Some(id), Some(page), query).await
}

/// Users following the caller.
#[axum::debug_handler]
pub async fn followers(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    list_follows(state, claims, Direction::Followers, None, None, query).await
}

/// Users following the user in the path.
#[axum::debug_handler]
pub async fn followers_of(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    list_follows(state, claims, Direction::Followers, Some(id), None, query).await
}

#[axum::debug_handler]
pub async fn followers_page(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path((id, page)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    list_follows(state, claims, Direction::Followers, Some(id), Some(page), query).await
}
