//! # OpenAPI Specification Assembly
//!
//! Assembles the utoipa-documented firmware routes into one OpenAPI 3.1
//! document, served unauthenticated at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the firmware API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "OTA Firmware Distribution API",
        version = "0.1.0",
        description = "Latest-version lookup with SHA-256 digests and path-safe artifact download for device fleets.",
        license(name = "AGPL-3.0-or-later")
    ),
    paths(
        crate::routes::firmware::latest_firmware,
        crate::routes::firmware::download_firmware,
    ),
    components(schemas(
        crate::routes::firmware::LatestFirmware,
        crate::error::ErrorBody,
    )),
    tags(
        (name = "firmware", description = "Firmware lookup and download")
    )
)]
pub struct ApiDoc;

pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
