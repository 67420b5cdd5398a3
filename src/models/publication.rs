use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A post written by a user.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Publication {
    pub id: Uuid,
    /// The author.
    pub user_id: Uuid,
    pub text: String,
    /// Reference to attached media, if any.
    pub file: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A publication with its author projected as `A`.
#[derive(Debug, Clone, Serialize)]
pub struct PublicationView<A> {
    #[serde(flatten)]
    pub publication: Publication,
    pub user: A,
}
