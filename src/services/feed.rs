use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        page::{Page, PageRequest},
        publication::PublicationView,
        user::PublicUser,
    },
    services::follows,
    state::AppState,
};

/// A feed page and the following-set it was built from.
pub struct Feed {
    pub page: Page<PublicationView<PublicUser>>,
    pub following: Vec<Uuid>,
}

/// Publications by the users `user` follows, newest first.
///
/// The follow summary has to succeed here: without it there is no feed, so
/// a failed lookup is an internal error rather than an empty annotation.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `user` - The reader.
/// * `page` - The requested page.
///
/// # Returns
///
/// A `Result` containing the `Feed`. Following nobody, or an empty page, is
/// `NotFound`.
pub async fn feed(state: &AppState, user: Uuid, page: PageRequest) -> Result<Feed> {
    let summary = follows::summarize(state, user).await.map_err(|e| {
        tracing::error!("❌ Follow summary failed while building feed for {}: {}", user, e);
        AppError::Internal("Could not load the users you follow".to_string())
    })?;

    if summary.following.is_empty() {
        return Err(AppError::NotFound("You are not following anyone yet".to_string()));
    }

    let (items, total) = state
        .publications
        .list_by_authors(&summary.following, page)
        .await?;
    let page = Page::new(items, page, total);

    if page.is_empty() {
        return Err(AppError::NotFound(
            page.empty_message("There are no publications in your feed"),
        ));
    }

    tracing::debug!("Feed for {}: {} of {} publications", user, page.items.len(), total);
    Ok(Feed {
        page,
        following: summary.following,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::user::NewUser, services::publications, state::test_state};

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
    async fn following_nobody_is_not_found() {
        let state = test_state();
        let u = user(&state, "u").await;
        let err = feed(&state, u, PageRequest { page: 1, limit: 5 })
            .await
            .err()
            .unwrap();
        assert!(matches!(err, AppError::NotFound(ref msg) if msg.contains("not following")));
    }

    #[tokio::test]
    async fn only_followed_authors_newest_first() {
        let state = test_state();
        let u = user(&state, "u").await;
        let b = user(&state, "b").await;
        let c = user(&state, "c").await;

        follows::follow(&state, u, b).await.unwrap();
        publications::create(&state, b, Some("b1")).await.unwrap();
        publications::create(&state, c, Some("c1")).await.unwrap();
        publications::create(&state, b, Some("b2")).await.unwrap();

        let feed = feed(&state, u, PageRequest { page: 1, limit: 5 }).await.unwrap();
        let texts: Vec<_> = feed.page.items.iter().map(|p| p.publication.text.as_str()).collect();
        assert_eq!(texts, ["b2", "b1"]);
        assert!(feed.page.items.iter().all(|p| p.user.id == b));
        assert_eq!(feed.following, vec![b]);
        assert_eq!(feed.page.meta.pages, 1);
    }
}
