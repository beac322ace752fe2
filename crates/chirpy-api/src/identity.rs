//! Account and session operations. Everything here is synchronous and runs on
//! the blocking pool; see `run_blocking`.

use tracing::{debug, info};

use chirpy_crypto::token;
use chirpy_db::{StoreError, UserRow, UserUpdate};
use chirpy_types::api::{
    CredentialsRequest, EVENT_USER_UPGRADED, SafeUser, SignedUser, TokenResponse,
    UpdateUserRequest, WebhookRequest,
};

use crate::error::ApiError;
use crate::state::AppStateInner;

fn safe_user(user: UserRow) -> SafeUser {
    SafeUser {
        id: user.id,
        email: user.email,
        is_premium: user.is_premium,
    }
}

fn validate_email(email: &str) -> Result<(), ApiError> {
    if email.is_empty() || !email.contains('@') {
        return Err(ApiError::validation("Email is invalid"));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ApiError> {
    if password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }
    Ok(())
}

pub fn register(state: &AppStateInner, req: CredentialsRequest) -> Result<SafeUser, ApiError> {
    validate_email(&req.email)?;
    validate_password(&req.password)?;

    let user = state.store.create_user(&req.email, &req.password)?;
    info!("Registered user {}", user.id);
    Ok(safe_user(user))
}

/// Unknown email and wrong password produce the same 401.
pub fn login(state: &AppStateInner, req: CredentialsRequest) -> Result<SignedUser, ApiError> {
    let (user, ok) = match state.store.verify_credentials(&req.email, &req.password) {
        Ok(result) => result,
        Err(StoreError::NotFound) => return Err(ApiError::unauthorized()),
        Err(e) => return Err(e.into()),
    };
    if !ok {
        debug!("Wrong password for user {}", user.id);
        return Err(ApiError::unauthorized());
    }

    let access = token::issue(user.id, &state.jwt_secret)
        .map_err(|e| ApiError::internal(format!("signing access token: {e}")))?;

    info!("User {} logged in", user.id);
    Ok(SignedUser {
        id: user.id,
        email: user.email,
        token: access,
        refresh_token: user.refresh_token,
        is_premium: user.is_premium,
    })
}

/// Exchange a live refresh token for a new access token. The refresh token
/// itself is left as is.
pub fn refresh(state: &AppStateInner, refresh_token: &str) -> Result<TokenResponse, ApiError> {
    let user = match state.store.get_user_by_refresh_token(refresh_token) {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            return Err(ApiError::Unauthorized("Invalid refresh token".to_string()));
        }
        Err(StoreError::Expired) => {
            return Err(ApiError::Unauthorized("Refresh token expired".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let access = token::issue(user.id, &state.jwt_secret)
        .map_err(|e| ApiError::internal(format!("signing access token: {e}")))?;
    Ok(TokenResponse { token: access })
}

pub fn revoke(state: &AppStateInner, refresh_token: &str) -> Result<(), ApiError> {
    match state.store.revoke_refresh_token(refresh_token) {
        Ok(()) => {
            info!("Refresh token revoked");
            Ok(())
        }
        Err(StoreError::NotFound) => Err(ApiError::Unauthorized("Invalid refresh token".to_string())),
        Err(e) => Err(e.into()),
    }
}

pub fn update_profile(
    state: &AppStateInner,
    user_id: u64,
    req: UpdateUserRequest,
) -> Result<SafeUser, ApiError> {
    if req.email.is_none() && req.password.is_none() {
        return Err(ApiError::validation("Nothing to update"));
    }
    if let Some(email) = req.email.as_deref() {
        validate_email(email)?;
    }
    if let Some(password) = req.password.as_deref() {
        validate_password(password)?;
    }

    let update = UserUpdate {
        email: req.email,
        password: req.password,
    };
    let user = match state.store.update_user(user_id, update) {
        Ok(user) => user,
        // A valid token for a user that no longer resolves.
        Err(StoreError::NotFound) => return Err(ApiError::unauthorized()),
        Err(e) => return Err(e.into()),
    };

    info!("Updated profile of user {}", user.id);
    Ok(safe_user(user))
}

/// Apply a payment-provider event. Only `user.upgraded` changes state; other
/// events are acknowledged and ignored.
pub fn apply_webhook(state: &AppStateInner, req: WebhookRequest) -> Result<(), ApiError> {
    if req.event != EVENT_USER_UPGRADED {
        debug!("Ignoring webhook event '{}'", req.event);
        return Ok(());
    }

    match state.store.upgrade_premium(req.data.user_id) {
        Ok(()) => {
            info!("User {} upgraded to Chirpy Red", req.data.user_id);
            Ok(())
        }
        Err(StoreError::NotFound) => Err(ApiError::not_found("Failed to upgrade user")),
        Err(e) => Err(e.into()),
    }
}
