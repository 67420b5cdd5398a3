use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{
        page::{Page, PageRequest},
        publication::{Publication, PublicationView},
        user::{AuthorName, PublicUser},
    },
    services::media::Upload,
    state::AppState,
};

/// Longest accepted publication text, in characters.
const MAX_TEXT_LEN: usize = 5000;

/// Publishes `text` as `author`.
pub async fn create(state: &AppState, author: Uuid, text: Option<&str>) -> Result<Publication> {
    let text = text.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(AppError::Validation("Publication text is required".to_string()));
    }
    if text.chars().count() > MAX_TEXT_LEN {
        return Err(AppError::Validation(format!(
            "Publication text must be at most {} characters",
            MAX_TEXT_LEN
        )));
    }

    let publication = state.publications.insert(author, text).await?;
    tracing::info!("✅ Publication {} created by {}", publication.id, author);
    Ok(publication)
}

/// A single publication with its author's name.
pub async fn get(state: &AppState, id: Uuid) -> Result<PublicationView<AuthorName>> {
    state
        .publications
        .find_with_author(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Publication does not exist".to_string()))
}

/// Deletes `id` if `author` wrote it.
pub async fn delete_owned(state: &AppState, author: Uuid, id: Uuid) -> Result<Publication> {
    let deleted = state
        .publications
        .delete_owned(author, id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Publication not found or it is not yours".to_string())
        })?;

    tracing::info!("🗑️ Publication {} deleted by {}", id, author);
    Ok(deleted)
}

/// Publications written by `author`, newest first.
///
/// An empty page is `NotFound`.
pub async fn list_by_author(
    state: &AppState,
    author: Uuid,
    page: PageRequest,
) -> Result<Page<PublicationView<PublicUser>>> {
    let (items, total) = state.publications.list_by_authors(&[author], page).await?;
    let page = Page::new(items, page, total);

    if page.is_empty() {
        return Err(AppError::NotFound(
            page.empty_message("This user has no publications"),
        ));
    }
    Ok(page)
}

/// Stores `upload` and attaches it to publication `id`.
///
/// # Arguments
///
/// * `state` - The application state.
/// * `author` - The authenticated user, who must have written the publication.
/// * `id` - The publication.
/// * `upload` - The image.
///
/// # Returns
///
/// A `Result` containing the updated `Publication`.
pub async fn attach_media(
    state: &AppState,
    author: Uuid,
    id: Uuid,
    upload: Upload,
) -> Result<Publication> {
    let publication = state
        .publications
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Publication does not exist".to_string()))?;

    if publication.user_id != author {
        tracing::warn!("❌ User {} tried to attach media to publication {}", author, id);
        return Err(AppError::Forbidden(
            "You can only attach media to your own publications".to_string(),
        ));
    }

    let reference = state.media.save(upload).await?;
    state
        .publications
        .set_file(id, &reference)
        .await?
        .ok_or_else(|| AppError::NotFound("Publication does not exist".to_string()))
}

/// URL of the media attached to publication `id`.
pub async fn media_url(state: &AppState, id: Uuid) -> Result<String> {
    let publication = state
        .publications
        .find(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Publication does not exist".to_string()))?;

    publication
        .file
        .map(|file| state.media.resolve(&file))
        .ok_or_else(|| AppError::NotFound("This publication has no media".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::user::NewUser, state::test_state};
    use axum::body::Bytes;

    const GIF: &[u8] = b"GIF89a\x01\x00\x01\x00\x80\x00\x00\xff\xff\xff\x00\x00\x00!\xf9\x04";

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
    async fn blank_text_is_rejected_and_not_stored() {
        let state = test_state();
        let author = user(&state, "a").await;

        for text in [None, Some(""), Some("   ")] {
            let err = create(&state, author, text).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
        assert_eq!(state.publications.count_by_author(author).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn only_the_author_deletes() {
        let state = test_state();
        let author = user(&state, "a").await;
        let other = user(&state, "b").await;
        let publication = create(&state, author, Some("hello")).await.unwrap();

        let err = delete_owned(&state, other, publication.id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        delete_owned(&state, author, publication.id).await.unwrap();
        assert!(matches!(
            get(&state, publication.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn empty_listing_is_not_found() {
        let state = test_state();
        let author = user(&state, "a").await;

        let err = list_by_author(&state, author, PageRequest { page: 1, limit: 5 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref msg) if msg.contains("no publications")));

        create(&state, author, Some("hi")).await.unwrap();
        let err = list_by_author(&state, author, PageRequest { page: 3, limit: 5 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(ref msg) if msg.contains("out of range")));
    }

    #[tokio::test]
    async fn media_is_owner_only() {
        let state = test_state();
        let author = user(&state, "a").await;
        let other = user(&state, "b").await;
        let publication = create(&state, author, Some("pic")).await.unwrap();

        let upload = Upload {
            file_name: Some("pic.gif".into()),
            bytes: Bytes::from_static(GIF),
        };

        let err = attach_media(&state, other, publication.id, upload.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        assert!(matches!(
            media_url(&state, publication.id).await.unwrap_err(),
            AppError::NotFound(_)
        ));

        let updated = attach_media(&state, author, publication.id, upload).await.unwrap();
        let file = updated.file.unwrap();
        assert!(file.ends_with(".gif"));
        assert_eq!(media_url(&state, publication.id).await.unwrap(), file);
    }
}
