mod config;

use anyhow::bail;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use chirpy_api::state::AppStateInner;
use chirpy_db::Store;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chirpy=debug,chirpy_api=debug,chirpy_db=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init store
    let store = Store::open(&config.db_path)?;
    if chirpy_api::assets_expose_store(&config.assets_dir, store.path()) {
        bail!(
            "CHIRPY_ASSETS_DIR ({}) contains the database ({}); point it at a separate directory",
            config.assets_dir.display(),
            store.path().display()
        );
    }

    let state = AppStateInner::new(store, config.jwt_secret, config.polka_api_key);

    let app = chirpy_api::router(state, &config.assets_dir)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Chirpy server listening on {}", config.addr);

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
