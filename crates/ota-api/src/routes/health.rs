//! # Health Probes
//!
//! Unauthenticated; mounted outside the key check.
//!
//! - GET /health/liveness — 200 while the process runs.
//! - GET /health/readiness — 200 when the latest pointer resolves to an
//!   artifact present in the store, 503 otherwise.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
}

/// Liveness probe.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. Does not hash; a located artifact is enough.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    let record = match state.resolver.resolve_latest() {
        Ok(record) => record,
        Err(e) => {
            tracing::warn!(error = %e, "readiness: latest pointer unresolved");
            return (StatusCode::SERVICE_UNAVAILABLE, "not ready");
        }
    };

    let store = Arc::clone(&state.store);
    let located = tokio::task::spawn_blocking(move || store.locate(&record.filename)).await;
    match located {
        Ok(Ok(_)) => (StatusCode::OK, "ready"),
        Ok(Err(e)) => {
            tracing::warn!(error = %e, "readiness: latest artifact unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "not ready")
        }
        Err(e) => {
            tracing::error!(error = %e, "readiness probe task failed");
            (StatusCode::SERVICE_UNAVAILABLE, "not ready")
        }
    }
}
