//! Info Endpoints
//!
//! - `/version` – cargo package name, version, and the git hash the binary
//!   was built from
//! - `/commitments` – the current epoch's commitment, for downstream
//!   verifiers
//!
//! The endpoints include a `Cache-Control: no-cache` header to prevent
//! caching of responses.

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use steward_types::EpochId;
use tower_http::set_header::SetResponseHeaderLayer;

use crate::AppState;

use super::errors::ApiError;

/// Create a router containing the info endpoints.
///
/// All endpoints have `Cache-Control: no-cache` set.
pub(crate) fn routes() -> Router<AppState> {
    Router::new()
        .route("/version", get(version))
        .route("/commitments", get(commitments))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        ))
}

/// Responds with cargo package name, cargo package version, and the git hash
/// of the repository that was used to build the binary.
async fn version() -> impl IntoResponse {
    (StatusCode::OK, crate::version_info())
}

/// Responds with the commitment of the current epoch.
///
/// Returns `404 Not Found` if no commitment is provisioned for the current
/// epoch.
async fn commitments(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let epoch = EpochId::current();
    let commitment = state.store.resolve_commitment(&epoch)?;
    Ok((StatusCode::OK, commitment.as_str().to_owned()))
}
