use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};

use chirpy_types::api::{CredentialsRequest, UpdateUserRequest};

use crate::error::ApiError;
use crate::identity;
use crate::middleware::{ApiJson, AuthUser, BearerToken};
use crate::run_blocking;
use crate::state::AppState;

pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(state, move |s| identity::register(s, req)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn update_user(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(state, move |s| identity::update_profile(s, user.user_id, req)).await?;
    Ok(Json(user))
}

pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<CredentialsRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = run_blocking(state, move |s| identity::login(s, req)).await?;
    Ok(Json(user))
}

pub async fn refresh(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<impl IntoResponse, ApiError> {
    let access = run_blocking(state, move |s| identity::refresh(s, &token)).await?;
    Ok(Json(access))
}

pub async fn revoke(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> Result<StatusCode, ApiError> {
    run_blocking(state, move |s| identity::revoke(s, &token)).await?;
    Ok(StatusCode::NO_CONTENT)
}
