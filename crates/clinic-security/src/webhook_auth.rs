//! Webhook credential checks
//!
//! All comparisons are constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Checks an `Authorization` header value of the form `Bearer <token>`.
pub fn verify_bearer(header_value: Option<&str>, expected: &str) -> bool {
    match header_value.and_then(|v| v.strip_prefix("Bearer ")) {
        Some(token) => constant_time_eq(token.trim().as_bytes(), expected.as_bytes()),
        None => false,
    }
}

pub fn verify_shared_secret(provided: Option<&str>, expected: &str) -> bool {
    provided
        .map(|p| constant_time_eq(p.as_bytes(), expected.as_bytes()))
        .unwrap_or(false)
}

pub fn compute_signature(secret: &str, body: &[u8]) -> String {
    // HMAC accepts keys of any length
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies a hex HMAC-SHA256 of the raw body, with or without a `sha256=` prefix.
pub fn verify_signature(provided: Option<&str>, secret: &str, body: &[u8]) -> bool {
    let Some(provided) = provided else {
        return false;
    };
    let provided = provided.trim();
    let provided = provided.strip_prefix("sha256=").unwrap_or(provided);
    let computed = compute_signature(secret, body);
    !computed.is_empty()
        && constant_time_eq(provided.to_ascii_lowercase().as_bytes(), computed.as_bytes())
}
