use axum::{extract::State, http::StatusCode};

use chirpy_types::api::WebhookRequest;

use crate::error::ApiError;
use crate::identity;
use crate::middleware::{ApiJson, WebhookKey};
use crate::run_blocking;
use crate::state::AppState;

/// Entitlement events from Polka, the payment provider.
pub async fn polka(
    State(state): State<AppState>,
    _key: WebhookKey,
    ApiJson(req): ApiJson<WebhookRequest>,
) -> Result<StatusCode, ApiError> {
    run_blocking(state, move |s| identity::apply_webhook(s, req)).await?;
    Ok(StatusCode::NO_CONTENT)
}
