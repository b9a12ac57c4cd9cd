//! Signed card identifiers.
//!
//! An id is 32 random bytes followed by their HMAC-SHA256 under a server
//! secret, encoded base64url without padding (86 characters). Holding the
//! secret is enough to tell a printed card from a guessed one.

use crate::error::{CaptainError, Result};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

const RANDOM_LEN: usize = 32;
const MAC_LEN: usize = 32;

fn mac(key: &[u8]) -> Result<HmacSha256> {
    HmacSha256::new_from_slice(key).map_err(|e| CaptainError::InvalidCardId(e.to_string()))
}

pub fn generate(key: &[u8]) -> Result<String> {
    let mut data = [0u8; RANDOM_LEN];
    rand::thread_rng().fill_bytes(&mut data);
    let mut m = mac(key)?;
    m.update(&data);
    let mut out = data.to_vec();
    out.extend_from_slice(&m.finalize().into_bytes());
    Ok(URL_SAFE_NO_PAD.encode(out))
}

/// Check that `id` was produced by [`generate`] with the same key.
pub fn verify(key: &[u8], id: &str) -> Result<()> {
    let raw = URL_SAFE_NO_PAD
        .decode(id.trim())
        .map_err(|_| CaptainError::InvalidCardId(id.to_string()))?;
    if raw.len() != RANDOM_LEN + MAC_LEN {
        return Err(CaptainError::InvalidCardId(id.to_string()));
    }
    let (data, sig) = raw.split_at(RANDOM_LEN);
    let mut m = mac(key)?;
    m.update(data);
    m.verify_slice(sig)
        .map_err(|_| CaptainError::InvalidCardId(id.to_string()))
}

/// Shorten an id for listings: `abcd...wxyz` with `n` characters on each
/// side. Ids too short to gain anything are returned unchanged.
pub fn abbreviate(id: &str, n: usize) -> String {
    let chars: Vec<char> = id.chars().collect();
    if chars.len() <= 3 + 2 * n {
        return id.to_string();
    }
    let head: String = chars[..n].iter().collect();
    let tail: String = chars[chars.len() - n..].iter().collect();
    format!("{head}...{tail}")
}
