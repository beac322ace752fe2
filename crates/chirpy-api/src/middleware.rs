use std::sync::atomic::Ordering;

use axum::{
    body::Bytes,
    extract::{FromRequest, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::de::DeserializeOwned;

use chirpy_crypto::{secret, token};

use crate::error::ApiError;
use crate::state::AppState;

/// Parsed `Authorization` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Credential {
    Bearer(String),
    ApiKey(String),
}

/// Split the header on whitespace; the first field picks the scheme and the
/// second is the credential. Anything else is `None`.
pub fn parse_authorization(headers: &HeaderMap) -> Option<Credential> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let mut fields = value.split_whitespace();
    let scheme = fields.next()?;
    let credential = fields.next()?.to_string();

    match scheme {
        "Bearer" => Some(Credential::Bearer(credential)),
        "ApiKey" => Some(Credential::ApiKey(credential)),
        _ => None,
    }
}

fn bearer(headers: &HeaderMap) -> Result<String, ApiError> {
    match parse_authorization(headers) {
        Some(Credential::Bearer(token)) => Ok(token),
        _ => Err(ApiError::unauthorized()),
    }
}

/// The user behind a valid access token.
///
/// Add `user: AuthUser` to a handler and axum rejects the request with 401
/// unless the `Authorization: Bearer` token verifies under the server secret.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: u64,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = bearer(&parts.headers)?;
        let user_id = token::parse(&raw, &state.jwt_secret)?;
        Ok(AuthUser { user_id })
    }
}

/// Raw bearer credential, for endpoints that take a refresh token.
#[derive(Debug, Clone)]
pub struct BearerToken(pub String);

impl<S> FromRequestParts<S> for BearerToken
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        bearer(&parts.headers).map(BearerToken)
    }
}

/// Proof that the request carries `Authorization: ApiKey <key>` with the
/// configured webhook key.
#[derive(Debug, Clone, Copy)]
pub struct WebhookKey;

impl FromRequestParts<AppState> for WebhookKey {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let expected = state
            .polka_api_key
            .as_deref()
            .ok_or_else(ApiError::unauthorized)?;

        match parse_authorization(&parts.headers) {
            Some(Credential::ApiKey(key)) if secret::keys_match(&key, expected) => Ok(WebhookKey),
            _ => Err(ApiError::unauthorized()),
        }
    }
}

/// JSON request body. The `Content-Type` header is not consulted; clients
/// that omit it or send `text/plain` are decoded all the same. Failures
/// render as the standard 400 error body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiJson<T>(pub T);

impl<T, S> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(req, state).await?;
        let value = serde_json::from_slice(&bytes)?;
        Ok(ApiJson(value))
    }
}

/// Count every request that reaches the static file mount.
pub async fn count_hits(State(state): State<AppState>, req: Request, next: Next) -> Response {
    state.hits.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}
