//! # Firmware Routes
//!
//! Routes:
//! - GET /firmware/latest — latest version, artifact name, and SHA-256
//!   (requires `x-api-key`; JSON errors)
//! - GET /firmware/download/{fname} — artifact bytes as an attachment
//!   (plain-text errors; key optional, see [`router`])
//!
//! Both handlers push store access onto the blocking pool. Neither builds a
//! filesystem path: they hand validated [`ArtifactName`]s to the store.

use std::fs::File;
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue};
use axum::middleware::from_fn;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use ota_core::digest::CHUNK_SIZE;
use ota_core::{ArtifactName, LocatedArtifact, Sha256Digest, StoreError};
use serde::{Deserialize, Serialize};
use tokio_util::io::ReaderStream;
use utoipa::ToSchema;

use crate::auth::{require_api_key, require_api_key_plain};
use crate::error::{AppError, PlainText};
use crate::state::AppState;

/// Body of a successful `GET /firmware/latest`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LatestFirmware {
    /// Symbolic version the latest pointer names.
    #[schema(example = "v2")]
    pub version: String,
    /// Artifact to pass to the download route.
    #[schema(example = "v2.0.bin")]
    pub filename: String,
    /// Lowercase hex SHA-256 of the artifact bytes.
    #[schema(example = "9f86d081884c7d659a2feaa0c55ad015a3bf4f1b2b0b822cd15d6c15b0f00a08")]
    pub sha256: String,
}

/// Build the firmware router.
///
/// `latest` always sits behind the key check. `download` does so only when
/// `download_requires_key` is set; otherwise it is open, as devices fetch
/// artifacts by the name `latest` handed them.
pub fn router(download_requires_key: bool) -> Router<AppState> {
    let latest = Router::new()
        .route("/firmware/latest", get(latest_firmware))
        .route_layer(from_fn(require_api_key));

    let mut download = Router::new().route("/firmware/download/{fname}", get(download_firmware));
    if download_requires_key {
        download = download.route_layer(from_fn(require_api_key_plain));
    }

    latest.merge(download)
}

/// GET /firmware/latest — Report the latest firmware and its digest.
#[utoipa::path(
    get,
    path = "/firmware/latest",
    params(("x-api-key" = String, Header, description = "Shared device secret")),
    responses(
        (status = 200, description = "Latest firmware", body = LatestFirmware),
        (status = 401, description = "Missing or wrong API key", body = crate::error::ErrorBody),
        (status = 404, description = "Mapped artifact missing from the store", body = crate::error::ErrorBody),
        (status = 500, description = "Latest pointer names an unmapped version", body = crate::error::ErrorBody),
    ),
    tag = "firmware"
)]
pub async fn latest_firmware(
    State(state): State<AppState>,
) -> Result<Json<LatestFirmware>, AppError> {
    // One resolution per request: everything reported below derives from it.
    let record = state.resolver.resolve_latest()?;

    let store = Arc::clone(&state.store);
    let name = record.filename.clone();
    let digest = tokio::task::spawn_blocking(move || -> Result<Sha256Digest, StoreError> {
        let located = store.locate(&name)?;
        store.digest(&located)
    })
    .await?
    .map_err(|e| {
        if e.is_not_found() {
            tracing::warn!(
                version = %record.version,
                artifact = %record.filename,
                "latest firmware artifact missing from store"
            );
        }
        e
    })?;

    tracing::info!(
        version = %record.version,
        artifact = %record.filename,
        sha256 = %digest,
        "served latest firmware"
    );

    Ok(Json(LatestFirmware {
        version: record.version.to_string(),
        filename: record.filename.to_string(),
        sha256: digest.to_hex(),
    }))
}

/// GET /firmware/download/{fname} — Stream an artifact.
#[utoipa::path(
    get,
    path = "/firmware/download/{fname}",
    params(("fname" = String, Path, description = "Artifact name as returned by /firmware/latest")),
    responses(
        (status = 200, description = "Artifact bytes", content_type = "application/octet-stream"),
        (status = 400, description = "Name contains a path separator or parent segment"),
        (status = 401, description = "Missing or wrong API key, when downloads require one"),
        (status = 404, description = "No such artifact"),
    ),
    tag = "firmware"
)]
pub async fn download_firmware(
    State(state): State<AppState>,
    Path(fname): Path<String>,
) -> Result<Response, PlainText> {
    let name = ArtifactName::parse(&fname).map_err(|e| {
        tracing::warn!(requested_len = fname.len(), reason = %e, "rejected artifact name");
        AppError::from(e)
    })?;

    let store = Arc::clone(&state.store);
    let (located, file, len) =
        tokio::task::spawn_blocking(move || -> Result<(LocatedArtifact, File, u64), StoreError> {
            let located = store.locate(&name)?;
            let file = store.open(&located)?;
            // Length of what was opened, not of what locate saw.
            let len = file
                .metadata()
                .map_err(|e| StoreError::from_io(located.name().as_str(), e))?
                .len();
            Ok((located, file, len))
        })
        .await
        .map_err(AppError::from)?
        .map_err(AppError::from)?;

    tracing::info!(artifact = %located.name(), bytes = len, "streaming firmware download");

    let stream = ReaderStream::with_capacity(tokio::fs::File::from_std(file), CHUNK_SIZE);
    let headers = [
        (
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/octet-stream"),
        ),
        (header::CONTENT_LENGTH, HeaderValue::from(len)),
        (
            header::CONTENT_DISPOSITION,
            content_disposition(located.name()),
        ),
    ];
    Ok((headers, Body::from_stream(stream)).into_response())
}

/// `attachment; filename="<name>"`, with quotes and backslashes escaped.
///
/// Falls back to a bare `attachment` if the name cannot be carried in a
/// header value.
fn content_disposition(name: &ArtifactName) -> HeaderValue {
    let mut escaped = String::with_capacity(name.as_str().len());
    for c in name.as_str().chars() {
        if matches!(c, '"' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    HeaderValue::from_str(&format!("attachment; filename=\"{escaped}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}
