use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::error::AppError;

#[derive(Serialize)]
struct Success<'a, T> {
    status: &'static str,
    #[serde(flatten)]
    body: &'a T,
}

/// A successful JSON reply, written with sonic-rs.
///
/// `T` must serialize as an object; its fields are placed next to
/// `"status": "success"`.
pub struct Reply<T>(pub StatusCode, pub T);

impl<T: Serialize> Reply<T> {
    pub fn ok(body: T) -> Self {
        Self(StatusCode::OK, body)
    }

    pub fn created(body: T) -> Self {
        Self(StatusCode::CREATED, body)
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        let envelope = Success {
            status: "success",
            body: &self.1,
        };

        match sonic_rs::to_vec(&envelope) {
            Ok(bytes) => (
                self.0,
                [(header::CONTENT_TYPE, "application/json")],
                bytes,
            )
                .into_response(),
            Err(e) => AppError::Internal(format!("Response serialization failed: {}", e))
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    #[derive(Serialize)]
    struct Body {
        message: &'static str,
        count: u32,
    }

    #[tokio::test]
    async fn fields_sit_next_to_status() {
        let response = Reply::created(Body {
            message: "done",
            count: 2,
        })
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["message"], "done");
        assert_eq!(json["count"], 2);
    }
}
