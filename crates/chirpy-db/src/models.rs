//! Persisted document shape. Field names follow the on-disk JSON format, which
//! predates this crate, hence the renames.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chirpy_crypto::random;

/// The whole database file. Map keys serialize as stringified integers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub users: BTreeMap<u64, UserRow>,
    #[serde(default)]
    pub chirps: BTreeMap<u64, ChirpRow>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: u64,
    pub email: String,
    #[serde(rename = "password")]
    pub password_hash: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(rename = "RefreshExpiration", default)]
    pub refresh_expires_at: DateTime<Utc>,
    #[serde(rename = "is_chirpy_red", default)]
    pub is_premium: bool,
}

impl UserRow {
    /// A refresh token is live when present and not yet past its expiry.
    pub fn has_live_refresh_token(&self, now: DateTime<Utc>) -> bool {
        !self.refresh_token.is_empty() && self.refresh_expires_at > now
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChirpRow {
    pub id: u64,
    pub author_id: u64,
    pub body: String,
}

/// Fields to change on a user. `None` keeps the current value.
#[derive(Debug, Default, Clone)]
pub struct UserUpdate {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl Document {
    pub(crate) fn user_id_by_email(&self, email: &str) -> Option<u64> {
        self.users
            .values()
            .find(|u| u.email == email)
            .map(|u| u.id)
    }

    pub(crate) fn user_id_by_refresh_token(&self, token: &str) -> Option<u64> {
        if token.is_empty() {
            return None;
        }
        self.users
            .values()
            .find(|u| u.refresh_token == token)
            .map(|u| u.id)
    }

    /// The user count plus one. Files with gaps in their ids (hand edits,
    /// older writers) can already hold that key; an existing row is never
    /// replaced, so fall back to one past the highest id.
    pub(crate) fn next_user_id(&self) -> u64 {
        let id = self.users.len() as u64 + 1;
        if !self.users.contains_key(&id) {
            return id;
        }
        self.users.keys().next_back().map_or(1, |max| max + 1)
    }

    /// Smallest positive id not held by a live chirp.
    pub(crate) fn next_chirp_id(&self) -> u64 {
        let mut id = 1;
        while self.chirps.contains_key(&id) {
            id += 1;
        }
        id
    }

    /// A fresh refresh token that no user currently holds.
    pub(crate) fn unused_refresh_token(&self) -> String {
        loop {
            let token = random::refresh_token();
            if self.user_id_by_refresh_token(&token).is_none() {
                return token;
            }
        }
    }
}
