//! HTTP server for the presenter

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::Router;
use mavsnap_core::settings::PresenterArgs;
use mavsnap_core::snapshot::SnapshotStore;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::routes;

pub(crate) type AppStateArc = Arc<AppState>;

/// Application state shared across handlers
pub struct AppState {
    pub snapshots: SnapshotStore,
    pub web_root: PathBuf,
}

impl AppState {
    pub fn new(snapshots: SnapshotStore, web_root: impl Into<PathBuf>) -> Self {
        Self {
            snapshots,
            web_root: web_root.into(),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.web_root.join("templates").join("index.html")
    }

    pub fn static_dir(&self) -> PathBuf {
        self.web_root.join("static")
    }
}

/// Build the presenter router.
pub fn router(state: AppState) -> Router {
    let static_dir = state.static_dir();
    let state = Arc::new(state);

    Router::new()
        .merge(routes::page_routes())
        .merge(routes::param_routes())
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until the process is stopped.
pub async fn run(args: &PresenterArgs) -> Result<()> {
    warn_if_missing(&args.params_dir, "snapshot directory");
    warn_if_missing(&args.web_root, "web root");

    let state = AppState::new(SnapshotStore::new(&args.params_dir), &args.web_root);
    let app = router(state);

    let addr = args.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}

fn warn_if_missing(path: &Path, what: &str) {
    if !path.is_dir() {
        warn!(path = %path.display(), "{what} does not exist yet");
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
