use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// Header carrying the base64 HMAC-SHA-256 signature of the request body.
pub const HASH_HEADER: &str = "HashSHA256";

type HmacSha256 = Hmac<Sha256>;

/// Keyed HMAC-SHA-256 signer. An empty key disables the stage: `sign`
/// produces nothing and `verify` accepts everything.
#[derive(Clone)]
pub struct Signer {
    key: Vec<u8>,
}

impl Signer {
    pub fn new(key: &str) -> Self {
        Self {
            key: key.as_bytes().to_vec(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.key.is_empty()
    }

    pub fn sign(&self, body: &[u8]) -> Option<String> {
        if self.key.is_empty() {
            return None;
        }
        let mut mac = HmacSha256::new_from_slice(&self.key).ok()?;
        mac.update(body);
        Some(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Constant-time comparison of a presented base64 signature against the
    /// body's actual HMAC.
    pub fn verify(&self, body: &[u8], presented: &str) -> bool {
        if self.key.is_empty() {
            return true;
        }
        let Ok(decoded) = STANDARD.decode(presented) else {
            return false;
        };
        let Ok(mut mac) = HmacSha256::new_from_slice(&self.key) else {
            return false;
        };
        mac.update(body);
        mac.verify_slice(&decoded).is_ok()
    }
}
