use std::time::Duration;

use axum::{
    body::Bytes,
    extract::{FromRequest, Multipart, Request},
};
use serde::de::DeserializeOwned;
use tokio::time::timeout;

use crate::{
    error::{AppError, Result},
    models::page::PageRequest,
    services::media::Upload,
};

/// Seconds to wait for each multipart field.
const UPLOAD_TIMEOUT: u64 = 60;

/// A JSON request body parsed with sonic-rs.
///
/// Unreadable or malformed bodies are rejected as `AppError::Validation`,
/// so they answer with the usual error envelope.
pub struct JsonBody<T>(pub T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state)
            .await
            .map_err(|e| AppError::Validation(e.body_text()))?;

        if bytes.is_empty() {
            return Err(AppError::Validation("Request body is empty".to_string()));
        }

        sonic_rs::from_slice(&bytes)
            .map(JsonBody)
            .map_err(|e| AppError::Validation(format!("Invalid JSON body: {}", e)))
    }
}

/// Reads the first file of a multipart body.
///
/// Fields without a file name are skipped; if none has one, the first field
/// is used.
pub async fn read_upload(mut multipart: Multipart) -> Result<Upload> {
    let timeout_duration = Duration::from_secs(UPLOAD_TIMEOUT);
    let mut fallback: Option<Upload> = None;

    loop {
        match timeout(timeout_duration, multipart.next_field()).await {
            Ok(Ok(Some(field))) => {
                let file_name = field.file_name().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Multipart(format!("file data: {}", e)))?;

                let upload = Upload { file_name, bytes };
                if upload.file_name.is_some() {
                    return Ok(upload);
                }
                fallback.get_or_insert(upload);
            }
            Ok(Ok(None)) => break,
            Ok(Err(e)) => return Err(AppError::Multipart(format!("Parse error: {}", e))),
            Err(_) => return Err(AppError::Multipart("Upload timeout exceeded".into())),
        }
    }

    fallback.ok_or_else(|| AppError::Validation("No file was uploaded".to_string()))
}

/// `?page=` and `?limit=` query parameters, kept as raw text.
#[derive(Debug, Default, serde::Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

impl PageQuery {
    /// Normalizes the page from the path (preferred) or the query string.
    pub fn request(&self, path_page: Option<&str>, default_limit: i64) -> PageRequest {
        PageRequest::parse(
            path_page.or(self.page.as_deref()),
            self.limit.as_deref(),
            default_limit,
        )
    }
}
