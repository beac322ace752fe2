use serde::{Deserialize, Serialize};

// -- JWT Claims --

/// Access-token claims. Shared by the token codec (chirpy-crypto) and the
/// HTTP layer so both sides agree on the wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub iss: String,
    pub iat: i64,
    pub exp: i64,
    /// Decimal user id.
    pub sub: String,
}

// -- Users --

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Profile update body. Either field may be omitted to keep the current value.
#[derive(Debug, Deserialize)]
pub struct UpdateUserRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// User view without credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafeUser {
    pub id: u64,
    pub email: String,
    #[serde(rename = "is_chirpy_red")]
    pub is_premium: bool,
}

/// User view returned by login, carrying both tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedUser {
    pub id: u64,
    pub email: String,
    pub token: String,
    pub refresh_token: String,
    #[serde(rename = "is_chirpy_red")]
    pub is_premium: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

// -- Chirps --

#[derive(Debug, Deserialize)]
pub struct CreateChirpRequest {
    #[serde(default)]
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChirpResponse {
    pub id: u64,
    pub author_id: u64,
    pub body: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChirpQuery {
    pub author_id: Option<String>,
    pub sort: Option<String>,
}

// -- Webhooks --

pub const EVENT_USER_UPGRADED: &str = "user.upgraded";

#[derive(Debug, Deserialize)]
pub struct WebhookRequest {
    pub event: String,
    #[serde(default)]
    pub data: WebhookData,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookData {
    #[serde(default)]
    pub user_id: u64,
}

// -- Errors --

/// Body of every error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
