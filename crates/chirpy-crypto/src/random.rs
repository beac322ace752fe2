use rand::RngCore;

/// Number of random bytes behind a refresh token.
pub const REFRESH_TOKEN_BYTES: usize = 32;

/// 32 bytes from the thread-local CSPRNG as 64 lowercase hex characters.
pub fn refresh_token() -> String {
    let mut bytes = [0u8; REFRESH_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}
