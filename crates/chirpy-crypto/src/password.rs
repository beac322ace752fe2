use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString};
use rand_core::OsRng;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct PasswordError(String);

/// Hash a password with Argon2id and a fresh salt. Returns the PHC string.
pub fn hash(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError(e.to_string()))?
        .to_string();
    Ok(hash)
}

/// Check `password` against a stored hash. Argon2 PHC strings are the
/// native format; bcrypt hashes (`$2a$`, `$2b$`, `$2y$`) written by earlier
/// deployments still verify. A malformed hash never verifies.
pub fn verify(hash: &str, password: &str) -> bool {
    if is_bcrypt(hash) {
        return match bcrypt::verify(password, hash) {
            Ok(ok) => ok,
            Err(e) => {
                warn!("Stored bcrypt hash is malformed: {}", e);
                false
            }
        };
    }

    let parsed = match PasswordHash::new(hash) {
        Ok(parsed) => parsed,
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            return false;
        }
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

fn is_bcrypt(hash: &str) -> bool {
    ["$2a$", "$2b$", "$2y$"].iter().any(|prefix| hash.starts_with(prefix))
}
