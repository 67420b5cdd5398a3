//! REST backend for a small social network: accounts, follows, publications
//! and a following-based feed.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod response;
pub mod routes;
pub mod state;

pub mod models {
    pub mod claims;
    pub mod follow;
    pub mod page;
    pub mod publication;
    pub mod user;
}

pub mod repositories {
    pub mod follow;
    pub mod memory;
    pub mod publication;
    pub mod user;
}

pub mod services {
    pub mod auth;
    pub mod feed;
    pub mod follows;
    pub mod media;
    pub mod publications;
    pub mod users;
}

pub mod handlers {
    pub mod auth;
    pub mod follows;
    pub mod health;
    pub mod publications;
    pub mod users;
}

pub mod middleware_layer {
    pub mod auth;
    pub mod rate_limit;
}

pub mod validation {
    pub mod users;
}

pub use config::Config;
pub use routes::app;
pub use state::AppState;
