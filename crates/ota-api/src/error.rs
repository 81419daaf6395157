//! # API Error Types
//!
//! Maps core failures to HTTP responses. The `latest` operation answers with
//! a JSON body `{"error": "..."}`; `download` answers in plain text via the
//! [`PlainText`] wrapper. Neither representation ever carries a filesystem
//! path, a directory listing, or an underlying error message: those go to
//! the log only.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ota_core::{ResolveError, StoreError, ValidationError};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Short, fixed, client-facing message.
    pub error: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Credential missing or mismatched (401).
    #[error("authentication failed")]
    Unauthorized,

    /// The latest pointer names an unmapped version (500). A deployment
    /// mistake, never retried.
    #[error("configuration error: {0}")]
    Config(String),

    /// Artifact absent from the store (404).
    #[error("artifact not found: {0}")]
    NotFound(String),

    /// A requested name failed validation before any I/O (400).
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),

    /// Any other failure (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// HTTP status for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Config(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message for the JSON representation.
    fn json_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Auth failed",
            Self::Config(_) => "Config error",
            Self::NotFound(_) => "File missing",
            Self::InvalidIdentifier(_) => "Invalid filename",
            Self::Internal(_) => "Internal error",
        }
    }

    /// Client-facing message for the plain-text representation.
    fn text_message(&self) -> &'static str {
        match self {
            Self::Unauthorized => "Unauthorized",
            Self::Config(_) | Self::Internal(_) => "Internal Server Error",
            Self::NotFound(_) => "Not Found",
            Self::InvalidIdentifier(_) => "Error",
        }
    }

    /// Log server-side failures for operator visibility.
    fn log(&self) {
        match self {
            Self::Config(_) => tracing::error!(error = %self, "firmware catalog misconfigured"),
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            _ => {}
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        self.log();
        let body = ErrorBody {
            error: self.json_message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Renders an [`AppError`] as a plain-text response.
#[derive(Debug)]
pub struct PlainText(pub AppError);

impl From<AppError> for PlainText {
    fn from(err: AppError) -> Self {
        Self(err)
    }
}

impl IntoResponse for PlainText {
    fn into_response(self) -> Response {
        self.0.log();
        (self.0.status(), self.0.text_message()).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(name) | StoreError::OutsideRoot(name) => Self::NotFound(name),
            other @ (StoreError::Io { .. } | StoreError::InvalidRoot { .. }) => {
                Self::Internal(other.to_string())
            }
        }
    }
}

impl From<ResolveError> for AppError {
    fn from(err: ResolveError) -> Self {
        match err {
            ResolveError::NotConfigured { .. } => Self::Config(err.to_string()),
            ResolveError::UnknownVersion(v) => Self::NotFound(v),
        }
    }
}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        Self::InvalidIdentifier(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        Self::Internal(format!("blocking task failed: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn json_parts(err: AppError) -> (StatusCode, ErrorBody) {
        let response = err.into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn text_parts(err: AppError) -> (StatusCode, String) {
        let response = PlainText(err).into_response();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        (status, String::from_utf8(bytes.to_vec()).unwrap())
    }

    #[test]
    fn status_codes() {
        assert_eq!(AppError::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            AppError::Config("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(AppError::NotFound("x".into()).status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::InvalidIdentifier("x".into()).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[tokio::test]
    async fn json_bodies_match_protocol() {
        assert_eq!(json_parts(AppError::Unauthorized).await.1.error, "Auth failed");
        assert_eq!(
            json_parts(AppError::Config("v3 unmapped".into())).await.1.error,
            "Config error"
        );
        assert_eq!(
            json_parts(AppError::NotFound("v2.0.bin".into())).await.1.error,
            "File missing"
        );
    }

    #[tokio::test]
    async fn internal_details_never_leak() {
        let (status, body) =
            json_parts(AppError::Internal("/srv/firmwares/v2.0.bin: EACCES".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.error, "Internal error");

        let (_, text) = text_parts(AppError::Internal("/srv/firmwares: EIO".into())).await;
        assert!(!text.contains("/srv"));
    }

    #[tokio::test]
    async fn plain_text_bodies() {
        assert_eq!(
            text_parts(AppError::InvalidIdentifier("..".into())).await,
            (StatusCode::BAD_REQUEST, "Error".to_string())
        );
        assert_eq!(
            text_parts(AppError::NotFound("missing.bin".into())).await,
            (StatusCode::NOT_FOUND, "Not Found".to_string())
        );
    }

    #[test]
    fn store_errors_map_by_kind() {
        assert!(matches!(
            AppError::from(StoreError::NotFound("a".into())),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(StoreError::OutsideRoot("a".into())),
            AppError::NotFound(_)
        ));
        let io = StoreError::Io {
            name: "a".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(matches!(AppError::from(io), AppError::Internal(_)));
    }

    #[test]
    fn resolve_errors_map_by_kind() {
        let err = AppError::from(ResolveError::NotConfigured {
            latest: "v3".into(),
        });
        assert!(matches!(err, AppError::Config(ref m) if m.contains("v3")));
        assert!(matches!(
            AppError::from(ResolveError::UnknownVersion("v9".into())),
            AppError::NotFound(_)
        ));
    }

    #[test]
    fn validation_errors_are_bad_requests() {
        let err = AppError::from(ValidationError::ParentSegment("../x".into()));
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
