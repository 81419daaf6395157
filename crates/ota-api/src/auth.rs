//! # Shared-Secret Authentication
//!
//! Devices present the shared secret in the `x-api-key` header on every
//! request. There is no session or token state: each request is checked
//! independently, in constant time, before any resolver lookup or
//! filesystem access happens.
//!
//! The check is installed as a route layer, so a rejected request never
//! reaches the handler at all.

use axum::extract::Request;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::AppError;

/// Header carrying the shared secret.
pub const API_KEY_HEADER: &str = "x-api-key";

/// The configured shared secret.
///
/// The backing string is wiped on drop. `Debug` never prints the value.
#[derive(Clone)]
pub struct ApiKey(Zeroizing<String>);

impl ApiKey {
    /// Wrap a secret. Returns `None` for an empty or blank value.
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        if secret.trim().is_empty() {
            return None;
        }
        Some(Self(Zeroizing::new(secret)))
    }

    fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ApiKey([REDACTED])")
    }
}

/// Result of checking a presented credential.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// The credential matches the configured secret.
    Authorized,
    /// The credential is missing or does not match.
    Unauthorized,
}

/// Constant-time comparison of the presented key against the secret.
///
/// When lengths differ, a dummy comparison keeps timing independent of
/// where the mismatch is.
fn constant_time_key_eq(provided: &[u8], expected: &[u8]) -> bool {
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Check a presented credential. No side effects.
pub fn authenticate(provided: Option<&str>, expected: &ApiKey) -> AuthOutcome {
    match provided {
        Some(value) if constant_time_key_eq(value.as_bytes(), expected.as_bytes()) => {
            AuthOutcome::Authorized
        }
        _ => AuthOutcome::Unauthorized,
    }
}

/// Auth configuration injected into request extensions.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub key: ApiKey,
}

/// Reject requests whose `x-api-key` header does not match the secret.
///
/// A request that reaches this layer without an [`AuthConfig`] extension is
/// rejected as well; a router assembled without a key must not fail open.
pub async fn require_api_key(request: Request, next: Next) -> Response {
    let Some(config) = request.extensions().get::<AuthConfig>() else {
        tracing::error!("auth layer installed without AuthConfig; rejecting request");
        return AppError::Unauthorized.into_response();
    };

    let provided = request
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok());

    match authenticate(provided, &config.key) {
        AuthOutcome::Authorized => next.run(request).await,
        AuthOutcome::Unauthorized => {
            tracing::warn!(
                path = %request.uri().path(),
                header_present = provided.is_some(),
                "authentication failed"
            );
            AppError::Unauthorized.into_response()
        }
    }
}

/// Plain-text variant for routes that answer in plain text.
pub async fn require_api_key_plain(request: Request, next: Next) -> Response {
    let response = require_api_key(request, next).await;
    if response.status() == StatusCode::UNAUTHORIZED {
        return crate::error::PlainText(AppError::Unauthorized).into_response();
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn key(s: &str) -> ApiKey {
        ApiKey::new(s).unwrap()
    }

    /// Build a minimal router with the auth layer and a simple handler.
    fn test_app(secret: &str) -> Router {
        Router::new()
            .route("/test", get(|| async { "ok" }))
            .route_layer(from_fn(require_api_key))
            .layer(axum::Extension(AuthConfig { key: key(secret) }))
    }

    #[test]
    fn authenticate_accepts_exact_key() {
        assert_eq!(
            authenticate(Some("OTA_KEY_2025"), &key("OTA_KEY_2025")),
            AuthOutcome::Authorized
        );
    }

    #[test]
    fn authenticate_rejects_missing_wrong_and_prefix() {
        let expected = key("OTA_KEY_2025");
        assert_eq!(authenticate(None, &expected), AuthOutcome::Unauthorized);
        assert_eq!(authenticate(Some("nope"), &expected), AuthOutcome::Unauthorized);
        assert_eq!(authenticate(Some("OTA_KEY"), &expected), AuthOutcome::Unauthorized);
        assert_eq!(authenticate(Some(""), &expected), AuthOutcome::Unauthorized);
        assert_eq!(
            authenticate(Some("OTA_KEY_2025 "), &expected),
            AuthOutcome::Unauthorized
        );
    }

    #[test]
    fn constant_time_eq_basics() {
        assert!(constant_time_key_eq(b"secret", b"secret"));
        assert!(!constant_time_key_eq(b"secreT", b"secret"));
        assert!(!constant_time_key_eq(b"", b"secret"));
    }

    #[test]
    fn blank_keys_are_refused() {
        assert!(ApiKey::new("").is_none());
        assert!(ApiKey::new("   ").is_none());
    }

    #[test]
    fn debug_redacts_secret() {
        let rendered = format!("{:?}", AuthConfig { key: key("hunter2") });
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("REDACTED"));
    }

    #[tokio::test]
    async fn valid_key_passes_through() {
        let response = test_app("s3cret")
            .oneshot(
                Request::builder()
                    .uri("/test")
                    .header(API_KEY_HEADER, "s3cret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"ok");
    }

    #[tokio::test]
    async fn missing_key_rejected_with_json() {
        let response = test_app("s3cret")
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"], "Auth failed");
    }

    #[tokio::test]
    async fn wrong_key_rejected() {
        let response = test_app("s3cret")
            .oneshot(
                Request::builder()
                    .uri("/test")
                    .header(API_KEY_HEADER, "guess")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn missing_auth_config_fails_closed() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .route_layer(from_fn(require_api_key));
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/test")
                    .header(API_KEY_HEADER, "anything")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn plain_variant_answers_in_text() {
        let app = Router::new()
            .route("/test", get(|| async { "ok" }))
            .route_layer(from_fn(require_api_key_plain))
            .layer(axum::Extension(AuthConfig { key: key("s3cret") }));
        let response = app
            .oneshot(Request::builder().uri("/test").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"Unauthorized");
    }
}
