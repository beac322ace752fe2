use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Compare a presented key with the configured one without leaking where
/// they differ. Both sides are MACed under a per-call random key, so the
/// tags have a fixed length and `verify_slice` compares them in constant time.
pub fn keys_match(presented: &str, expected: &str) -> bool {
    let mut nonce = [0u8; 32];
    rand::rng().fill_bytes(&mut nonce);

    let (Some(expected_mac), Some(presented_mac)) = (tag(&nonce, expected), tag(&nonce, presented))
    else {
        return false;
    };
    let expected_tag = expected_mac.finalize().into_bytes();
    presented_mac.verify_slice(&expected_tag).is_ok()
}

fn tag(key: &[u8], value: &str) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(key).ok()?;
    mac.update(value.as_bytes());
    Some(mac)
}
