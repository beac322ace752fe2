use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};

use chirpy_types::api::{ChirpQuery, CreateChirpRequest};

use crate::error::ApiError;
use crate::middleware::{ApiJson, AuthUser};
use crate::resources;
use crate::run_blocking;
use crate::state::AppState;

pub async fn create_chirp(
    State(state): State<AppState>,
    user: AuthUser,
    ApiJson(req): ApiJson<CreateChirpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let chirp = run_blocking(state, move |s| resources::create_chirp(s, user.user_id, req)).await?;
    Ok((StatusCode::CREATED, Json(chirp)))
}

pub async fn list_chirps(
    State(state): State<AppState>,
    Query(query): Query<ChirpQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let chirps = run_blocking(state, move |s| resources::list_chirps(s, &query)).await?;
    Ok(Json(chirps))
}

pub async fn get_chirp(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let chirp = run_blocking(state, move |s| resources::get_chirp(s, &id)).await?;
    Ok(Json(chirp))
}

pub async fn delete_chirp(
    State(state): State<AppState>,
    Path(id): Path<String>,
    user: AuthUser,
) -> Result<StatusCode, ApiError> {
    run_blocking(state, move |s| resources::delete_chirp(s, &id, user.user_id)).await?;
    Ok(StatusCode::NO_CONTENT)
}
