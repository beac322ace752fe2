//! Chirpy credential primitives.
//!
//! - `token`: HS256 access tokens carrying a numeric user id.
//! - `password`: Argon2id password hashing; legacy bcrypt hashes still verify.
//! - `random`: opaque refresh tokens.
//! - `secret`: constant-time comparison of shared keys.

pub mod password;
pub mod random;
pub mod secret;
pub mod token;
