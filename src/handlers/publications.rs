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
        page::{PageMeta, DEFAULT_PAGE_SIZE},
        publication::{Publication, PublicationView},
        user::{AuthorName, PublicUser},
    },
    response::Reply,
    services::{feed as feed_service, publications as publication_service},
    state::AppState,
    validation::users::{parse_id, PublicationRequest},
};

#[derive(Serialize)]
pub struct PublicationResponse {
    pub message: &'static str,
    pub publication: Publication,
}

#[derive(Serialize)]
pub struct PublicationDetailResponse {
    pub publication: PublicationView<AuthorName>,
}

#[derive(Serialize)]
pub struct PublicationListResponse {
    pub publications: Vec<PublicationView<PublicUser>>,
    #[serde(flatten)]
    pub meta: PageMeta,
}

#[derive(Serialize)]
pub struct FeedResponse {
    pub publications: Vec<PublicationView<PublicUser>>,
    #[serde(flatten)]
    pub meta: PageMeta,
    pub following: Vec<Uuid>,
}

/// Publishes a new post as the caller.
#[axum::debug_handler]
pub async fn create(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    JsonBody(payload): JsonBody<PublicationRequest>,
) -> Result<impl IntoResponse> {
    let publication =
        publication_service::create(&state, claims.sub, payload.text.as_deref()).await?;
    Ok(Reply::created(PublicationResponse {
        message: "Publication created",
        publication,
    }))
}

/// Returns one publication.
#[axum::debug_handler]
pub async fn detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_id(&id, "publication")?;
    let publication = publication_service::get(&state, id).await?;
    Ok(Reply::ok(PublicationDetailResponse { publication }))
}

/// Deletes one of the caller's publications.
#[axum::debug_handler]
pub async fn remove(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_id(&id, "publication")?;
    let publication = publication_service::delete_owned(&state, claims.sub, id).await?;
    Ok(Reply::ok(PublicationResponse {
        message: "Publication deleted",
        publication,
    }))
}

async fn list_for_author(
    state: AppState,
    author: String,
    page: Option<String>,
    query: PageQuery,
) -> Result<Reply<PublicationListResponse>> {
    let author = parse_id(&author, "user")?;
    let request = query.request(page.as_deref(), DEFAULT_PAGE_SIZE);
    let page = publication_service::list_by_author(&state, author, request).await?;
    Ok(Reply::ok(PublicationListResponse {
        publications: page.items,
        meta: page.meta,
    }))
}

/// Publications of a user, first page.
#[axum::debug_handler]
pub async fn by_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    list_for_author(state, id, None, query).await
}

/// Publications of a user, page taken from the path.
#[axum::debug_handler]
pub async fn by_user_page(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, String)>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    list_for_author(state, id, Some(page), query).await
}

/// Attaches an uploaded image to one of the caller's publications.
#[axum::debug_handler]
pub async fn upload_media(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<String>,
    multipart: Multipart,
) -> Result<impl IntoResponse> {
    let id = parse_id(&id, "publication")?;
    tracing::info!("📤 Media upload for publication {} from user: {}", id, claims.sub);

    let upload = read_upload(multipart).await?;
    let publication = publication_service::attach_media(&state, claims.sub, id, upload).await?;
    Ok(Reply::ok(PublicationResponse {
        message: "Media attached",
        publication,
    }))
}

/// Redirects to the media of a publication.
#[axum::debug_handler]
pub async fn media(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse> {
    let id = parse_id(&id, "publication")?;
    let url = publication_service::media_url(&state, id).await?;
    Ok(Redirect::temporary(&url))
}

async fn feed_page(
    state: AppState,
    claims: Claims,
    page: Option<String>,
    query: PageQuery,
) -> Result<Reply<FeedResponse>> {
    let request = query.request(page.as_deref(), DEFAULT_PAGE_SIZE);
    let feed = feed_service::feed(&state, claims.sub, request).await?;
    Ok(Reply::ok(FeedResponse {
        publications: feed.page.items,
        meta: feed.page.meta,
        following: feed.following,
    }))
}

/// The caller's feed, first page.
#[axum::debug_handler]
pub async fn feed(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    feed_page(state, claims, None, query).await
}

/// The caller's feed, page taken from the path.
#[axum::debug_handler]
pub async fn feed_at(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(page): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<impl IntoResponse> {
    feed_page(state, claims, Some(page), query).await
}
