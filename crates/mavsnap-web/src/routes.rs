//! Route handlers for the presenter.
//!
//! `/` and `/params/<filename>` resolve to a single file on disk which
//! [`ServeFile`] then answers (content type, conditional requests, 404).
//! `/static` is nested as a [`ServeDir`](tower_http::services::ServeDir) in
//! [`crate::server::router`].

use std::path::PathBuf;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tracing::debug;

use crate::server::AppStateArc;

// ============================================================================
// Page Routes
// ============================================================================

pub fn page_routes() -> Router<AppStateArc> {
    Router::new().route("/", get(index))
}

async fn index(State(state): State<AppStateArc>, request: Request) -> Response {
    serve_file(state.index_path(), request).await
}

// ============================================================================
// Snapshot Routes
// ============================================================================

pub fn param_routes() -> Router<AppStateArc> {
    Router::new().route("/params/:filename", get(serve_param))
}

async fn serve_param(
    State(state): State<AppStateArc>,
    Path(filename): Path<String>,
    request: Request,
) -> Response {
    let Some(path) = state.snapshots.resolve(&filename) else {
        debug!(%filename, "rejected snapshot file name");
        return StatusCode::NOT_FOUND.into_response();
    };
    serve_file(path, request).await
}

// ============================================================================
// Helpers
// ============================================================================

async fn serve_file(path: PathBuf, request: Request) -> Response {
    match ServeFile::new(path).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
