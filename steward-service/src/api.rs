//! API module for the steward's glue HTTP surface.
//!
//! This module defines the small HTTP surface the steward serves next to the
//! rotation subsystem and organizes it into submodules:
//!
//! - [`errors`] – Defines API error types and conversions from internal
//!   service errors.
//! - [`health`] – Provides health endpoints (`/health`).
//! - [`info`] – Info about the deployment (`/version`, `/commitments`).

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub(crate) mod errors;
pub(crate) mod health;
pub(crate) mod info;

/// Builds the router for the steward's HTTP surface.
pub(crate) fn routes(app_state: AppState) -> Router {
    Router::new()
        .merge(health::routes())
        .merge(info::routes())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
