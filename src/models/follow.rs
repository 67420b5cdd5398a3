use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::{AuthorName, PublicUser};

/// A directed edge: `following_user` follows `followed_user`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Follow {
    /// The unique identifier for the edge.
    pub id: Uuid,
    /// The user doing the following.
    pub following_user: Uuid,
    /// The user being followed.
    pub followed_user: Uuid,
    /// The timestamp when the edge was created.
    pub created_at: DateTime<Utc>,
}

/// An edge together with the public profile of its other endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct FollowEntry {
    #[serde(flatten)]
    pub follow: Follow,
    pub user: PublicUser,
}

/// A freshly created edge, labelled with the followed user's name.
#[derive(Debug, Clone, Serialize)]
pub struct FollowCreated {
    #[serde(flatten)]
    pub follow: Follow,
    #[serde(rename = "followedUser")]
    pub followed: AuthorName,
}

/// Ids a user follows and ids following that user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FollowSummary {
    pub following: Vec<Uuid>,
    pub followers: Vec<Uuid>,
}

/// Edges between one pair of users, in both directions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relationship {
    /// `a -> b`, if present.
    pub following: Option<Follow>,
    /// `b -> a`, if present.
    pub follower: Option<Follow>,
}

/// Follow summary attached to listing responses.
///
/// A failed lookup still yields an annotation so the listing itself
/// can be served; `complete` tells the client the lists are not real.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FollowAnnotation {
    pub users_following: Vec<Uuid>,
    pub user_follow_me: Vec<Uuid>,
    pub complete: bool,
}

impl FollowAnnotation {
    pub fn from_lookup(lookup: Result<FollowSummary, AppError>) -> Self {
        match lookup {
            Ok(summary) => Self {
                users_following: summary.following,
                user_follow_me: summary.followers,
                complete: true,
            },
            Err(e) => {
                tracing::warn!("⚠️ Follow summary unavailable, serving empty lists: {}", e);
                Self {
                    users_following: Vec::new(),
                    user_follow_me: Vec::new(),
                    complete: false,
                }
            }
        }
    }
}

/// Relationship attached to profile responses.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RelationshipAnnotation {
    pub following: Option<Follow>,
    pub follower: Option<Follow>,
    pub complete: bool,
}

impl RelationshipAnnotation {
    pub fn from_lookup(lookup: Result<Relationship, AppError>) -> Self {
        match lookup {
            Ok(relationship) => Self {
                following: relationship.following,
                follower: relationship.follower,
                complete: true,
            },
            Err(e) => {
                tracing::warn!("⚠️ Relationship unavailable, serving none: {}", e);
                Self {
                    following: None,
                    follower: None,
                    complete: false,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successful_summary_is_complete() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let annotation = FollowAnnotation::from_lookup(Ok(FollowSummary {
            following: vec![a],
            followers: vec![b],
        }));

        assert!(annotation.complete);
        assert_eq!(annotation.users_following, vec![a]);
        assert_eq!(annotation.user_follow_me, vec![b]);
    }

    #[test]
    fn failed_summary_is_empty_but_flagged() {
        let annotation =
            FollowAnnotation::from_lookup(Err(AppError::Internal("connection reset".into())));

        assert!(!annotation.complete);
        assert!(annotation.users_following.is_empty());
        assert!(annotation.user_follow_me.is_empty());
    }

    #[test]
    fn failed_relationship_is_flagged() {
        let annotation =
            RelationshipAnnotation::from_lookup(Err(AppError::Internal("timeout".into())));
        assert!(!annotation.complete);
        assert!(annotation.following.is_none());
        assert!(annotation.follower.is_none());
    }

    #[test]
    fn genuine_absence_is_complete() {
        let annotation = RelationshipAnnotation::from_lookup(Ok(Relationship::default()));
        assert!(annotation.complete);
        assert!(annotation.following.is_none());
    }
}
