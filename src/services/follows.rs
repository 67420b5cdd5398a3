use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        follow::{Follow, FollowCreated, FollowEntry, FollowSummary, Relationship},
        page::{Page, PageRequest},
    },
    repositories::follow::{Direction, ALREADY_FOLLOWING, TARGET_MISSING},
    state::AppState,
};

/// Makes `acting` follow `target`.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `acting` - The authenticated user.
/// * `target` - The user to follow.
///
/// # Returns
///
/// A `Result` containing the new edge labelled with the target's name.
pub async fn follow(state: &AppState, acting: Uuid, target: Uuid) -> Result<FollowCreated> {
    if acting == target {
        return Err(AppError::Validation("You can't follow yourself".to_string()));
    }

    let followed = state
        .users
        .find_by_id(target)
        .await?
        .ok_or_else(|| AppError::NotFound(TARGET_MISSING.to_string()))?;

    if state.follows.find(acting, target).await?.is_some() {
        return Err(AppError::Conflict(ALREADY_FOLLOWING.to_string()));
    }

    // A concurrent follow of the same pair fails here with the same Conflict.
    let follow = state.follows.insert(acting, target).await?;
    tracing::info!("✅ User {} now follows {}", acting, target);

    Ok(FollowCreated {
        follow,
        followed: followed.author_name(),
    })
}

/// Removes the edge `acting -> target`.
pub async fn unfollow(state: &AppState, acting: Uuid, target: Uuid) -> Result<Follow> {
    let removed = state
        .follows
        .delete(acting, target)
        .await?
        .ok_or_else(|| AppError::NotFound("You are not following this user".to_string()))?;

    tracing::info!("✅ User {} unfollowed {}", acting, target);
    Ok(removed)
}

/// One page of the users `user` follows, or of its followers.
pub async fn list(
    state: &AppState,
    user: Uuid,
    direction: Direction,
    page: PageRequest,
) -> Result<Page<FollowEntry>> {
    let (entries, total) = state.follows.list(user, direction, page).await?;
    tracing::debug!(
        "Listed {} of {} {:?} edges for {}",
        entries.len(),
        total,
        direction,
        user
    );
    Ok(Page::new(entries, page, total))
}

/// Ids `user` follows and ids following `user`.
///
/// Both lookups run concurrently; either failing fails the whole summary.
pub async fn summarize(state: &AppState, user: Uuid) -> Result<FollowSummary> {
    let (following, followers) = tokio::try_join!(
        state.follows.following_ids(user),
        state.follows.follower_ids(user),
    )?;

    Ok(FollowSummary {
        following,
        followers,
    })
}

/// The edges between `a` and `b` in both directions.
pub async fn relationship(state: &AppState, a: Uuid, b: Uuid) -> Result<Relationship> {
    let (following, follower) = tokio::try_join!(state.follows.find(a, b), state.follows.find(b, a))?;
    Ok(Relationship {
        following,
        follower,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::user::NewUser, state::test_state};

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
    async fn cannot_follow_self() {
        let state = test_state();
        let a = user(&state, "a").await;
        let err = follow(&state, a, a).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn second_follow_conflicts_without_second_edge() {
        let state = test_state();
        let a = user(&state, "a").await;
        let b = user(&state, "b").await;

        let created = follow(&state, a, b).await.unwrap();
        assert_eq!(created.followed.id, b);

        let err = follow(&state, a, b).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));

        let summary = summarize(&state, a).await.unwrap();
        assert_eq!(summary.following, vec![b]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn simultaneous_follows_leave_one_edge() {
        let state = test_state();
        let a = user(&state, "a").await;
        let b = user(&state, "b").await;

        let first = tokio::spawn({
            let state = state.clone();
            async move { follow(&state, a, b).await }
        });
        let second = tokio::spawn({
            let state = state.clone();
            async move { follow(&state, a, b).await }
        });
        let (first, second) = tokio::join!(first, second);
        let outcomes = [first.unwrap(), second.unwrap()];

        assert_eq!(outcomes.iter().filter(|o| o.is_ok()).count(), 1);
        assert_eq!(
            outcomes
                .iter()
                .filter(|o| matches!(o, Err(AppError::Conflict(_))))
                .count(),
            1
        );
        assert_eq!(state.follows.count(a, Direction::Following).await.unwrap(), 1);
        assert_eq!(state.follows.count(b, Direction::Followers).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn following_a_missing_user_is_not_found() {
        let state = test_state();
        let a = user(&state, "a").await;
        let err = follow(&state, a, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unfollow_twice_is_not_found() {
        let state = test_state();
        let a = user(&state, "a").await;
        let b = user(&state, "b").await;

        follow(&state, a, b).await.unwrap();
        unfollow(&state, a, b).await.unwrap();
        let err = unfollow(&state, a, b).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn summary_matches_edges() {
        let state = test_state();
        let u = user(&state, "u").await;
        let b = user(&state, "b").await;
        let c = user(&state, "c").await;

        follow(&state, u, b).await.unwrap();
        follow(&state, c, u).await.unwrap();

        let summary = summarize(&state, u).await.unwrap();
        assert_eq!(summary.following, vec![b]);
        assert_eq!(summary.followers, vec![c]);

        let rel = relationship(&state, u, b).await.unwrap();
        assert!(rel.following.is_some());
        assert!(rel.follower.is_none());
    }

    #[tokio::test]
    async fn followers_listing_shows_the_follower() {
        let state = test_state();
        let a = user(&state, "a").await;
        let b = user(&state, "b").await;
        follow(&state, a, b).await.unwrap();

        let page = list(&state, b, Direction::Followers, PageRequest { page: 1, limit: 5 })
            .await
            .unwrap();
        assert_eq!(page.meta.total, 1);
        assert_eq!(page.items[0].user.id, a);
        assert_eq!(page.items[0].user.nick, "a");
    }
}
