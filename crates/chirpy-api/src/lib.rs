pub mod admin;
pub mod auth;
pub mod chirps;
pub mod error;
pub mod identity;
pub mod middleware;
pub mod resources;
pub mod state;
pub mod webhooks;

use std::path::Path;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::state::{AppState, AppStateInner};

/// Run a store-backed operation on the blocking pool. The task runs to
/// completion even if the request is dropped.
pub(crate) async fn run_blocking<F, T>(state: AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&AppStateInner) -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&state))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::internal("blocking task failed")
        })?
}

/// True when the store file (or its temp file) lives somewhere under
/// `assets_dir`, i.e. serving `assets_dir` would publish password hashes and
/// refresh tokens. A missing assets directory exposes nothing.
pub fn assets_expose_store(assets_dir: &Path, store_path: &Path) -> bool {
    let Ok(assets) = assets_dir.canonicalize() else {
        return false;
    };
    let store_dir = match store_path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    store_dir
        .canonicalize()
        .is_ok_and(|dir| dir.starts_with(&assets))
}

/// All routes. `assets_dir` is served under `/app`, where requests are counted.
/// The mount is left out entirely when it would expose the store file.
pub fn router(state: AppState, assets_dir: &Path) -> Router {
    let mut router = Router::new()
        .route("/api/healthz", get(admin::healthz))
        .route("/admin/metrics", get(admin::metrics))
        .route("/api/reset", post(admin::reset))
        .route("/api/chirps", get(chirps::list_chirps).post(chirps::create_chirp))
        .route("/api/chirps/{id}", get(chirps::get_chirp).delete(chirps::delete_chirp))
        .route("/api/users", post(auth::register).put(auth::update_user))
        .route("/api/login", post(auth::login))
        .route("/api/refresh", post(auth::refresh))
        .route("/api/revoke", post(auth::revoke))
        .route("/api/polka/webhooks", post(webhooks::polka));

    if assets_expose_store(assets_dir, state.store.path()) {
        warn!(
            "Not serving {} under /app: it contains the database {}",
            assets_dir.display(),
            state.store.path().display()
        );
    } else {
        let app_files = ServiceBuilder::new()
            .layer(from_fn_with_state(state.clone(), middleware::count_hits))
            .service(ServeDir::new(assets_dir));
        router = router.nest_service("/app", app_files);
    }

    router.with_state(state)
}
