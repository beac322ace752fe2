use std::sync::atomic::Ordering;

use axum::{
    extract::State,
    http::{StatusCode, header},
    response::{Html, IntoResponse},
};
use tracing::info;

use crate::state::AppState;

pub async fn healthz() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], "OK")
}

pub async fn metrics(State(state): State<AppState>) -> Html<String> {
    Html(render_metrics(state.hits.load(Ordering::Relaxed)))
}

pub async fn reset(State(state): State<AppState>) -> StatusCode {
    state.hits.store(0, Ordering::Relaxed);
    info!("Request counter reset");
    StatusCode::OK
}

fn render_metrics(hits: u64) -> String {
    format!(
        "<html>\n\n<body>\n    <h1>Welcome, Chirpy Admin</h1>\n    <p>Chirpy has been visited {hits} times!</p>\n</body>\n\n</html>\n"
    )
}
