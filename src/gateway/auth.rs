//! Bearer token verification.
//!
//! Token issuance lives with the account service; the core only verifies.
//! Tokens are `{user_id}.{expiry_unix}.{base64 hmac}` signed with the
//! shared secret, checked in constant time.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub struct TokenVerifier {
    secret: String,
}

impl TokenVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Returns the authenticated user id, or `None` for anything invalid:
    /// bad shape, bad signature, expired.
    pub fn verify(&self, token: &str) -> Option<String> {
        let mut parts = token.splitn(3, '.');
        let user_id = parts.next()?;
        let expiry = parts.next()?;
        let signature = parts.next()?;
        if user_id.is_empty() {
            return None;
        }

        let expiry_unix: i64 = expiry.parse().ok()?;
        if expiry_unix < Utc::now().timestamp() {
            return None;
        }

        let expected = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes()).ok()?;
        mac.update(format!("{user_id}.{expiry}").as_bytes());
        // Constant-time comparison
        mac.verify_slice(&expected).ok()?;
        Some(user_id.to_owned())
    }

    /// Mint a token; used by tests and the operator tooling that seeds
    /// accounts, never by request handlers.
    pub fn mint(&self, user_id: &str, ttl_secs: i64) -> String {
        let expiry = Utc::now().timestamp() + ttl_secs;
        let payload = format!("{user_id}.{expiry}");
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{payload}.{signature}")
    }
}
