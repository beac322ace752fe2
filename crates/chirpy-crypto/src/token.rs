use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use thiserror::Error;

use chirpy_types::api::Claims;

pub const ISSUER: &str = "chirpy";

/// Lifetime of an access token, in seconds.
pub const ACCESS_TOKEN_TTL_SECS: i64 = 60 * 60;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("token expired")]
    Expired,
    #[error("invalid token: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("invalid subject '{0}'")]
    Subject(String),
}

/// Sign a one-hour access token for `user_id`.
pub fn issue(user_id: u64, secret: &str) -> Result<String, TokenError> {
    issue_with_ttl(user_id, secret, Duration::seconds(ACCESS_TOKEN_TTL_SECS))
}

pub(crate) fn issue_with_ttl(
    user_id: u64,
    secret: &str,
    ttl: Duration,
) -> Result<String, TokenError> {
    let now = Utc::now();
    let claims = Claims {
        iss: ISSUER.to_string(),
        iat: now.timestamp(),
        exp: (now + ttl).timestamp(),
        sub: user_id.to_string(),
    };

    let token = encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify signature, algorithm, issuer and expiry, then return the user id in `sub`.
pub fn parse(token: &str, secret: &str) -> Result<u64, TokenError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.leeway = 0;
    validation.set_issuer(&[ISSUER]);
    validation.set_required_spec_claims(&["exp", "iss", "sub"]);

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
            _ => TokenError::Invalid(e),
        })?;

    match data.claims.sub.parse::<u64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(TokenError::Subject(data.claims.sub)),
    }
}
