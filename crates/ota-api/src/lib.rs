//! # ota-api — Axum Firmware Distribution Service
//!
//! HTTP(S) surface of the firmware server. Devices ask which firmware is
//! current, receive its name and SHA-256, then download the bytes and verify
//! them locally.
//!
//! ## API Surface
//!
//! | Route                          | Auth            | Errors     |
//! |--------------------------------|-----------------|------------|
//! | `GET /firmware/latest`         | `x-api-key`     | JSON       |
//! | `GET /firmware/download/{fname}` | optional      | plain text |
//! | `GET /health/liveness`         | none            |            |
//! | `GET /health/readiness`        | none            |            |
//! | `GET /openapi.json`            | none            |            |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! CatchPanicLayer → TraceLayer → AuthMiddleware (route layer) → Handler
//! ```
//!
//! The key check is a route layer, so requests for unknown paths fall
//! through to 404 without being asked for credentials, and a rejected
//! request never reaches the resolver or the store.

pub mod auth;
pub mod bootstrap;
pub mod error;
pub mod openapi;
pub mod routes;
pub mod state;

use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        key: state.config.api_key.clone(),
    };

    Router::new()
        .merge(routes::health::router())
        .merge(routes::firmware::router(state.config.download_requires_key))
        .merge(openapi::router())
        .layer(axum::Extension(auth_config))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
}
