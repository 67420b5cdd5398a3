use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        follow::{FollowAnnotation, RelationshipAnnotation},
        page::{Page, PageRequest},
        user::{PublicUser, User, UserChanges},
    },
    repositories::follow::Direction,
    services::{auth::hash_password, follows, media::Upload},
    state::AppState,
    validation::users::{check, validate_nick, validate_password, UpdateUserRequest},
};

/// Activity counters for one user.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Counters {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub name: String,
    pub last_name: String,
    #[serde(rename = "followingCount")]
    pub following: i64,
    #[serde(rename = "followedCount")]
    pub followed: i64,
    #[serde(rename = "publicationsCount")]
    pub publications: i64,
}

async fn require_user(state: &AppState, id: Uuid) -> Result<User> {
    state
        .users
        .find_by_id(id)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))
}

/// The public profile of `id`, with how `viewer` and `id` follow each other.
pub async fn profile(
    state: &AppState,
    viewer: Uuid,
    id: Uuid,
) -> Result<(PublicUser, RelationshipAnnotation)> {
    let user = require_user(state, id).await?;
    let relationship =
        RelationshipAnnotation::from_lookup(follows::relationship(state, viewer, id).await);
    Ok((user.public(), relationship))
}

/// One page of the user directory, annotated with `viewer`'s follow summary.
pub async fn list(
    state: &AppState,
    viewer: Uuid,
    page: PageRequest,
) -> Result<(Page<PublicUser>, FollowAnnotation)> {
    let (users, total) = state.users.list(page).await?;
    let page = Page::new(users.iter().map(User::public).collect(), page, total);

    if page.is_empty() {
        return Err(AppError::NotFound(page.empty_message("There are no users")));
    }

    let annotation = FollowAnnotation::from_lookup(follows::summarize(state, viewer).await);
    Ok((page, annotation))
}

/// Applies a profile update for `user_id`.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `user_id` - The authenticated user.
/// * `request` - Fields to change; a new password is re-hashed.
///
/// # Returns
///
/// A `Result` containing the updated `User`. An email or nick taken by
/// someone else is a `Conflict`.
pub async fn update(state: &AppState, user_id: Uuid, request: UpdateUserRequest) -> Result<User> {
    check(&request)?;
    if let Some(nick) = &request.nick {
        validate_nick(nick)?;
    }
    if let Some(password) = &request.password {
        validate_password(password)?;
    }

    let mut changes = UserChanges {
        name: request.name.map(|name| name.trim().to_string()),
        last_name: request.last_name.map(|last_name| last_name.trim().to_string()),
        nick: request.nick.map(|nick| nick.trim().to_string()),
        email: request.email.map(|email| email.trim().to_string()),
        bio: request.bio.map(|bio| bio.trim().to_string()),
        password_hash: None,
    };
    if let Some(password) = &request.password {
        changes.password_hash = Some(hash_password(password)?);
    }

    if changes.is_empty() {
        return Err(AppError::Validation("Nothing to update".to_string()));
    }

    let taken = state
        .users
        .find_by_email_or_nick(changes.email.as_deref(), changes.nick.as_deref())
        .await?
        .into_iter()
        .any(|other| other.id != user_id);
    if taken {
        return Err(AppError::Conflict(
            "A user with that email or nick already exists".to_string(),
        ));
    }

    let user = state
        .users
        .update(user_id, changes)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    tracing::info!("✅ Profile updated for user: {}", user_id);
    Ok(user)
}

/// Stores `upload` as the avatar of `user_id`.
pub async fn upload_avatar(state: &AppState, user_id: Uuid, upload: Upload) -> Result<User> {
    let reference = state.media.save(upload).await?;
    let user = state
        .users
        .set_image(user_id, &reference)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    tracing::info!("✅ Avatar updated for user: {}", user_id);
    Ok(user)
}

/// URL of the avatar of `id`.
pub async fn avatar_url(state: &AppState, id: Uuid) -> Result<String> {
    let user = require_user(state, id).await?;
    Ok(state.media.resolve(&user.image))
}

/// How many users `id` follows, is followed by, and has published.
pub async fn counters(state: &AppState, id: Uuid) -> Result<Counters> {
    let user = require_user(state, id).await?;
    let (following, followed, publications) = tokio::try_join!(
        state.follows.count(id, Direction::Following),
        state.follows.count(id, Direction::Followers),
        state.publications.count_by_author(id),
    )?;

    Ok(Counters {
        user_id: user.id,
        name: user.name,
        last_name: user.last_name,
        following,
        followed,
        publications,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::user::{NewUser, DEFAULT_IMAGE},
        services::{auth::verify_password, publications},
        state::test_state,
    };

    async fn user(state: &AppState, nick: &str) -> Uuid {
        state
            .users
            .create(NewUser {
                name: nick.to_string(),
                last_name: "Test".to_string(),
                nick: nick.to_string(),
                email: format!("{}@x.com", nick),
                bio: None,
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn update_changes_fields_and_rehashes_password() {
        let state = test_state();
        let id = user(&state, "alice").await;

        let updated = update(
            &state,
            id,
            UpdateUserRequest {
                name: Some("  Alicia ".into()),
                password: Some("new-secret".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

        assert_eq!(updated.name, "Alicia");
        assert_eq!(updated.nick, "alice");
        assert!(verify_password("new-secret", &updated.password).unwrap());
    }

    #[tokio::test]
    async fn update_to_someone_elses_email_conflicts() {
        let state = test_state();
        user(&state, "alice").await;
        let bob = user(&state, "bob").await;

        let err = update(
            &state,
            bob,
            UpdateUserRequest {
                email: Some("ALICE@x.com".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        // Keeping one's own nick is not a collision.
        update(
            &state,
            bob,
            UpdateUserRequest {
                nick: Some("bob".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn blank_names_are_rejected_on_update() {
        let state = test_state();
        let id = user(&state, "alice").await;

        for request in [
            UpdateUserRequest {
                name: Some("   ".into()),
                ..Default::default()
            },
            UpdateUserRequest {
                last_name: Some(" ".into()),
                ..Default::default()
            },
        ] {
            let err = update(&state, id, request).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        let kept = state.users.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(kept.name, "alice");
        assert_eq!(kept.last_name, "Test");
    }

    #[tokio::test]
    async fn blank_bio_clears_it() {
        let state = test_state();
        let id = user(&state, "alice").await;
        let with_bio = |bio: &str| UserChanges {
            bio: Some(bio.to_string()),
            ..Default::default()
        };
        state.users.update(id, with_bio("hello")).await.unwrap();

        let updated = update(
            &state,
            id,
            UpdateUserRequest {
                bio: Some("  ".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(updated.bio, None);
    }

    #[tokio::test]
    async fn empty_update_is_rejected() {
        let state = test_state();
        let id = user(&state, "alice").await;
        let err = update(&state, id, UpdateUserRequest::default()).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn counters_count_everything() {
        let state = test_state();
        let a = user(&state, "a").await;
        let b = user(&state, "b").await;
        let c = user(&state, "c").await;

        follows::follow(&state, a, b).await.unwrap();
        follows::follow(&state, a, c).await.unwrap();
        follows::follow(&state, c, a).await.unwrap();
        publications::create(&state, a, Some("hello")).await.unwrap();

        let counters = counters(&state, a).await.unwrap();
        assert_eq!(counters.following, 2);
        assert_eq!(counters.followed, 1);
        assert_eq!(counters.publications, 1);

        let json = sonic_rs::to_string(&counters).unwrap();
        assert!(json.contains("\"followingCount\":2"));
        assert!(json.contains("\"userId\""));
    }

    #[tokio::test]
    async fn default_avatar_resolves_under_media_prefix() {
        let state = test_state();
        let id = user(&state, "a").await;
        assert_eq!(
            avatar_url(&state, id).await.unwrap(),
            format!("/media/{}", DEFAULT_IMAGE)
        );
        assert!(matches!(
            avatar_url(&state, Uuid::new_v4()).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn profile_annotates_relationship() {
        let state = test_state();
        let a = user(&state, "a").await;
        let b = user(&state, "b").await;
        follows::follow(&state, b, a).await.unwrap();

        let (profile, relationship) = profile(&state, a, b).await.unwrap();
        assert_eq!(profile.id, b);
        assert!(relationship.complete);
        assert!(relationship.following.is_none());
        assert!(relationship.follower.is_some());
    }

    #[tokio::test]
    async fn directory_pages_and_annotates() {
        let state = test_state();
        let a = user(&state, "a").await;
        for nick in ["b", "c", "d", "e"] {
            user(&state, nick).await;
        }

        let (page, annotation) = list(&state, a, PageRequest { page: 2, limit: 4 }).await.unwrap();
        assert_eq!(page.meta.total, 5);
        assert_eq!(page.meta.pages, 2);
        assert_eq!(page.items.len(), 1);
        assert!(annotation.complete);

        assert!(list(&state, a, PageRequest { page: 3, limit: 4 }).await.is_err());
    }
}
