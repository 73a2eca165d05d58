//! Application error taxonomy mapped onto HTTP responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Errors a handler can surface to the client.
///
/// Everything the client sees is a JSON `{"message": ...}` body; the
/// underlying cause of an `Internal` error only goes to the operator log.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Authentication(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            AppError::Authentication(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Internal(e) => {
                tracing::error!(error = %e, "unexpected failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(json!({ "message": message }));
        (status, body).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn response_parts(err: AppError) -> (StatusCode, serde_json::Value) {
        let res = err.into_response();
        let status = res.status();
        let bytes = to_bytes(res.into_body(), usize::MAX)
            .await
            .expect("read body");
        (status, serde_json::from_slice(&bytes).expect("json body"))
    }

    #[tokio::test]
    async fn validation_maps_to_400() {
        let (status, body) = response_parts(AppError::Validation("missing".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "missing");
    }

    #[tokio::test]
    async fn conflict_maps_to_409() {
        let (status, body) = response_parts(AppError::Conflict("taken".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["message"], "taken");
    }

    #[tokio::test]
    async fn authentication_maps_to_401() {
        let (status, body) = response_parts(AppError::Authentication("nope".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "nope");
    }

    #[tokio::test]
    async fn internal_hides_the_cause() {
        let (status, body) =
            response_parts(AppError::Internal(anyhow::anyhow!("pool exploded"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
    }
}
