use std::{path::PathBuf, sync::Arc};

use axum::body::Bytes;
use tokio::sync::{Semaphore, SemaphorePermit};

use crate::{
    config::Config,
    error::{AppError, Result},
    models::user::DEFAULT_IMAGE,
};

/// Avatar served for users that never uploaded one.
const DEFAULT_AVATAR: &[u8] = include_bytes!("../../assets/default_user.png");

/// Concurrent media writes allowed at once.
pub const UPLOAD_SLOTS: usize = 32;

/// A file taken from a multipart body.
#[derive(Debug, Clone)]
pub struct Upload {
    /// Name the client gave the file, if any. Only used for logging.
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// Bounds how many uploads are written to disk at the same time.
#[derive(Clone)]
pub struct UploadRateLimiter {
    semaphore: Arc<Semaphore>,
}

impl UploadRateLimiter {
    /// Creates a new `UploadRateLimiter`.
    pub fn new(slots: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(slots)),
        }
    }

    /// Acquires a permit from the semaphore.
    pub async fn acquire(&self) -> Result<SemaphorePermit<'_>> {
        self.semaphore
            .acquire()
            .await
            .map_err(|_| AppError::Internal("Upload limiter closed".to_string()))
    }

    /// Returns the number of available permits.
    pub fn available_permits(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// Stores uploaded images on the local disk and turns references into URLs.
#[derive(Clone)]
pub struct MediaStore {
    dir: PathBuf,
    url_prefix: String,
    max_bytes: usize,
    limiter: UploadRateLimiter,
}

impl MediaStore {
    pub fn new(dir: PathBuf, url_prefix: impl Into<String>, max_bytes: usize) -> Self {
        Self {
            dir,
            url_prefix: url_prefix.into().trim_end_matches('/').to_string(),
            max_bytes,
            limiter: UploadRateLimiter::new(UPLOAD_SLOTS),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.media_dir.clone(),
            config.media_url_prefix.clone(),
            config.max_upload_bytes,
        )
    }

    /// Directory the files are written to.
    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    /// Writes the default avatar into the media directory unless it is
    /// already there.
    pub async fn ensure_default_avatar(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(DEFAULT_IMAGE);
        if !tokio::fs::try_exists(&path).await? {
            tokio::fs::write(&path, DEFAULT_AVATAR).await?;
            tracing::info!("✅ Default avatar written to {}", path.display());
        }
        Ok(())
    }

    /// Validates and writes `upload`, returning its reference.
    ///
    /// Files are named by the BLAKE3 hash of their content, so uploading the
    /// same image twice stores it once.
    ///
    /// # Arguments
    ///
    /// * `upload` - The uploaded file.
    ///
    /// # Returns
    ///
    /// A `Result` containing the reference `<url_prefix>/<hash>.<ext>`.
    pub async fn save(&self, upload: Upload) -> Result<String> {
        if upload.bytes.is_empty() {
            return Err(AppError::Validation("No file was uploaded".to_string()));
        }
        if upload.bytes.len() > self.max_bytes {
            return Err(AppError::Validation(format!(
                "File is too large, the limit is {} bytes",
                self.max_bytes
            )));
        }

        let kind = infer::get(&upload.bytes)
            .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
            .ok_or_else(|| {
                tracing::warn!(
                    "❌ Rejected upload {:?}: not an image",
                    upload.file_name.as_deref().unwrap_or("<unnamed>")
                );
                AppError::Validation("Only image files are accepted".to_string())
            })?;

        let name = format!("{}.{}", blake3::hash(&upload.bytes).to_hex(), kind.extension());

        let _permit = self.limiter.acquire().await?;
        tracing::debug!(
            "📊 Upload slots in use: {}",
            UPLOAD_SLOTS.saturating_sub(self.limiter.available_permits())
        );

        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(&name);
        if tokio::fs::try_exists(&path).await? {
            tracing::debug!("Media {} already stored", name);
        } else {
            tokio::fs::write(&path, &upload.bytes).await?;
            tracing::info!("✅ Stored media {} ({} bytes, {})", name, upload.bytes.len(), kind.mime_type());
        }

        Ok(format!("{}/{}", self.url_prefix, name))
    }

    /// URL a stored reference is served from.
    ///
    /// Absolute URLs and paths are returned as they are; bare names, like the
    /// default avatar, are placed under the media prefix.
    pub fn resolve(&self, reference: &str) -> String {
        if reference.starts_with("http://")
            || reference.starts_with("https://")
            || reference.starts_with('/')
        {
            reference.to_string()
        } else {
            format!("{}/{}", self.url_prefix, reference)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Smallest valid PNG header plus IHDR chunk start.
    const PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00,
    ];

    fn store(dir: &tempfile::TempDir) -> MediaStore {
        MediaStore::new(dir.path().to_path_buf(), "/media/", 1024)
    }

    fn upload(bytes: &'static [u8]) -> Upload {
        Upload {
            file_name: Some("pic.png".into()),
            bytes: Bytes::from_static(bytes),
        }
    }

    #[tokio::test]
    async fn stores_images_by_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(&dir);

        let first = media.save(upload(PNG)).await.unwrap();
        let second = media.save(upload(PNG)).await.unwrap();

        assert_eq!(first, second);
        assert!(first.starts_with("/media/"));
        assert!(first.ends_with(".png"));

        let name = first.trim_start_matches("/media/");
        assert!(dir.path().join(name).exists());
    }

    #[tokio::test]
    async fn default_avatar_is_seeded_once() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(&dir);
        let path = dir.path().join(DEFAULT_IMAGE);

        media.ensure_default_avatar().await.unwrap();
        let seeded = std::fs::read(&path).unwrap();
        assert_eq!(infer::get(&seeded).map(|kind| kind.mime_type()), Some("image/png"));

        std::fs::write(&path, PNG).unwrap();
        media.ensure_default_avatar().await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), PNG);
    }

    #[tokio::test]
    async fn rejects_non_images() {
        let dir = tempfile::tempdir().unwrap();
        let err = store(&dir).save(upload(b"just some text")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn rejects_empty_and_oversized() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(&dir);

        let err = media.save(upload(b"")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let big = Upload {
            file_name: None,
            bytes: Bytes::from([PNG, &[0u8; 2048]].concat()),
        };
        let err = media.save(big).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(ref msg) if msg.contains("too large")));
    }

    #[test]
    fn resolves_references() {
        let dir = tempfile::tempdir().unwrap();
        let media = store(&dir);

        assert_eq!(media.resolve("default_user.png"), "/media/default_user.png");
        assert_eq!(media.resolve("/media/abc.png"), "/media/abc.png");
        assert_eq!(
            media.resolve("https://cdn.example.com/a.png"),
            "https://cdn.example.com/a.png"
        );
    }
}
