use tracing::info;

use chirpy_db::{ChirpRow, StoreError};
use chirpy_types::api::{ChirpQuery, ChirpResponse, CreateChirpRequest};

use crate::error::ApiError;
use crate::state::AppStateInner;

/// Longest accepted chirp body, in bytes.
pub const MAX_CHIRP_LEN: usize = 140;

const PROFANE_WORDS: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];
const CENSORED: &str = "****";

fn to_response(chirp: ChirpRow) -> ChirpResponse {
    ChirpResponse {
        id: chirp.id,
        author_id: chirp.author_id,
        body: chirp.body,
    }
}

/// Replace profane words with `****`. Words are whitespace-separated and
/// matched case-insensitively; when anything is replaced the words are
/// rejoined with single spaces.
pub fn clean_body(body: &str) -> String {
    let mut censored = false;
    let words: Vec<&str> = body
        .split_whitespace()
        .map(|word| {
            if PROFANE_WORDS.contains(&word.to_lowercase().as_str()) {
                censored = true;
                CENSORED
            } else {
                word
            }
        })
        .collect();

    if censored {
        words.join(" ")
    } else {
        body.to_string()
    }
}

fn parse_chirp_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse().map_err(|_| ApiError::not_found("Invalid ID"))
}

pub fn create_chirp(
    state: &AppStateInner,
    author_id: u64,
    req: CreateChirpRequest,
) -> Result<ChirpResponse, ApiError> {
    if req.body.len() > MAX_CHIRP_LEN {
        return Err(ApiError::validation("Chirp is too long"));
    }

    let body = clean_body(&req.body);
    let chirp = match state.store.create_chirp(author_id, &body) {
        Ok(chirp) => chirp,
        Err(StoreError::NotFound) => return Err(ApiError::unauthorized()),
        Err(e) => return Err(e.into()),
    };
    Ok(to_response(chirp))
}

pub fn get_chirp(state: &AppStateInner, raw_id: &str) -> Result<ChirpResponse, ApiError> {
    let id = parse_chirp_id(raw_id)?;
    match state.store.get_chirp(id) {
        Ok(chirp) => Ok(to_response(chirp)),
        Err(StoreError::NotFound) => Err(ApiError::not_found("That chirp does not exist")),
        Err(e) => Err(e.into()),
    }
}

/// `author_id` filters by author (unparsable values match nothing); `sort=desc`
/// orders by descending id, anything else ascending.
pub fn list_chirps(state: &AppStateInner, query: &ChirpQuery) -> Result<Vec<ChirpResponse>, ApiError> {
    let mut chirps = state.store.list_chirps()?;

    if let Some(author) = query.author_id.as_deref().filter(|a| !a.is_empty()) {
        let author_id: u64 = author.parse().unwrap_or(0);
        chirps.retain(|c| c.author_id == author_id);
    }

    if query.sort.as_deref() == Some("desc") {
        chirps.sort_by(|a, b| b.id.cmp(&a.id));
    } else {
        chirps.sort_by_key(|c| c.id);
    }

    Ok(chirps.into_iter().map(to_response).collect())
}

pub fn delete_chirp(state: &AppStateInner, raw_id: &str, user_id: u64) -> Result<(), ApiError> {
    let id = parse_chirp_id(raw_id)?;
    match state.store.delete_chirp(id, user_id) {
        Ok(()) => {
            info!("User {} deleted chirp {}", user_id, id);
            Ok(())
        }
        Err(StoreError::NotFound) => Err(ApiError::not_found("That chirp does not exist")),
        Err(StoreError::Forbidden) => Err(ApiError::Forbidden(
            "You can only delete your own chirps".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}
