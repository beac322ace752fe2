use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use chirpy_db::Store;

pub type AppState = Arc<AppStateInner>;

/// Everything a handler needs, passed explicitly through axum state.
pub struct AppStateInner {
    pub store: Store,
    pub jwt_secret: String,
    /// Shared key for the payment provider's webhooks. `None` rejects them all.
    pub polka_api_key: Option<String>,
    /// Requests served under `/app`.
    pub hits: AtomicU64,
}

impl AppStateInner {
    pub fn new(store: Store, jwt_secret: String, polka_api_key: Option<String>) -> AppState {
        Arc::new(Self {
            store,
            jwt_secret,
            polka_api_key,
            hits: AtomicU64::new(0),
        })
    }
}
