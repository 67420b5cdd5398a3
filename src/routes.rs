use std::time::Duration;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::{delete, get, post, put},
    Router,
};
use http::{header, HeaderValue, Method};
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    services::ServeDir,
    trace::{DefaultMakeSpan, DefaultOnFailure, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::{
    config::Config,
    handlers::{auth, follows, health, publications, users},
    middleware_layer::{auth::require_auth, rate_limit},
    state::AppState,
};

/// Room for multipart boundaries and headers on top of the file itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

fn cors_layer(config: &Config) -> CorsLayer {
    let origin = if config.cors_origins.iter().any(|origin| origin == "*") {
        AllowOrigin::any()
    } else {
        let origins: Vec<HeaderValue> = config
            .cors_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("⚠️ Ignoring invalid CORS origin: {}", origin);
                    None
                }
            })
            .collect();
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::ACCEPT])
        .max_age(Duration::from_secs(86400))
}

/// Builds the HTTP application.
///
/// Per-IP request throttling is added by the binary, which has the peer
/// address; everything else is wired here.
///
/// # Arguments
///
/// * `state` - The application state.
///
/// # Returns
///
/// The `Router` serving the API and the media directory.
pub fn app(state: AppState) -> Router {
    let auth_layer = from_fn_with_state(state.clone(), require_auth);

    let register_routes = Router::new()
        .route("/api/user/register", post(auth::register))
        .route_layer(from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_register,
        ));

    let login_routes = Router::new()
        .route("/api/user/login", post(auth::login))
        .route_layer(from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_login,
        ));

    let public_routes = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/user/avatar/{id}", get(users::avatar))
        .route("/api/publication/user/{id}", get(publications::by_user))
        .route(
            "/api/publication/user/{id}/{page}",
            get(publications::by_user_page),
        )
        .route(
            "/api/publication/{id}",
            get(publications::detail)
                .merge(delete(publications::remove).route_layer(auth_layer.clone())),
        )
        .route(
            "/api/publication/media/{id}",
            get(publications::media)
                .merge(post(publications::upload_media).route_layer(auth_layer.clone())),
        );

    let protected_routes = Router::new()
        .route("/api/user/profile/{id}", get(users::profile))
        .route("/api/user/list", get(users::list))
        .route("/api/user/list/{page}", get(users::list_page))
        .route("/api/user/update", put(users::update))
        .route("/api/user/upload-avatar", post(users::upload_avatar))
        .route("/api/user/counters", get(users::counters))
        .route("/api/user/counters/{id}", get(users::counters_of))
        .route("/api/follow/follow", post(follows::follow))
        .route("/api/follow/unfollow/{id}", delete(follows::unfollow))
        .route("/api/follow/following", get(follows::following))
        .route("/api/follow/following/{id}", get(follows::following_of))
        .route("/api/follow/following/{id}/{page}", get(follows::following_page))
        .route("/api/follow/followers", get(follows::followers))
        .route("/api/follow/followers/{id}", get(follows::followers_of))
        .route("/api/follow/followers/{id}/{page}", get(follows::followers_page))
        .route("/api/publication", post(publications::create))
        .route("/api/publication/feed", get(publications::feed))
        .route("/api/publication/feed/{page}", get(publications::feed_at))
        .route_layer(auth_layer);

    let mut app = Router::new()
        .merge(register_routes)
        .merge(login_routes)
        .merge(public_routes)
        .merge(protected_routes);

    let prefix = state.config.media_url_prefix.as_str();
    if prefix.starts_with('/') && prefix.len() > 1 {
        app = app.nest_service(prefix, ServeDir::new(state.media.dir()));
    } else {
        tracing::info!("Media prefix {:?} is not a local path, not serving media", prefix);
    }

    app.layer(
        TraceLayer::new_for_http()
            .make_span_with(DefaultMakeSpan::default().include_headers(false))
            .on_request(DefaultOnRequest::default().level(Level::DEBUG))
            .on_response(DefaultOnResponse::default().level(Level::DEBUG))
            .on_failure(DefaultOnFailure::default().level(Level::ERROR)),
    )
    .layer(DefaultBodyLimit::max(
        state.config.max_upload_bytes + MULTIPART_OVERHEAD,
    ))
    .layer(cors_layer(&state.config))
    .with_state(state)
}
