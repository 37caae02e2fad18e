// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Control-layer step tokens: signed, scoped to one
//! `step_id`, 24h expiry. HMAC-SHA256 over a `base64url`-free plain payload
//! keeps the token a single opaque string suitable for an `Authorization:
//! Bearer` header, the same shape as signed webhook tokens.

use base64::Engine;
use hmac::{Hmac, Mac};
use lazyaf_core::{EngineError, StepId};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default token lifetime.
pub const DEFAULT_TTL_SECONDS: u64 = 24 * 60 * 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub step_id: StepId,
    pub expires_at_ms: u64,
}

/// Mints and validates step tokens with a shared HMAC secret.
pub struct ControlTokenService {
    mac: HmacSha256,
}

impl ControlTokenService {
    /// `secret` may be any length: HMAC-SHA256 pads short keys and hashes
    /// down long ones, so construction never actually fails.
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        let mac = HmacSha256::new_from_slice(secret.as_ref())
            .unwrap_or_else(|_| unreachable!("HMAC-SHA256 accepts a key of any length"));
        Self { mac }
    }

    /// `"{step_id}.{expires_at_ms}.{signature}"`, base64url-encoded
    /// signature over `"{step_id}.{expires_at_ms}"`.
    pub fn mint(&self, step_id: StepId, now_ms: u64, ttl_seconds: u64) -> String {
        let expires_at_ms = now_ms + ttl_seconds * 1000;
        let payload = format!("{step_id}.{expires_at_ms}");
        let signature = self.sign(&payload);
        format!("{payload}.{signature}")
    }

    /// Validates signature, expiry, and that the token is scoped to
    /// `expected_step_id`.
    pub fn validate(&self, token: &str, expected_step_id: StepId, now_ms: u64) -> Result<TokenClaims, EngineError> {
        let mut parts = token.rsplitn(2, '.');
        let signature = parts.next().ok_or_else(|| EngineError::forbidden("malformed token"))?;
        let payload = parts.next().ok_or_else(|| EngineError::forbidden("malformed token"))?;

        let expected_signature = self.sign(payload);
        if !constant_time_eq(signature.as_bytes(), expected_signature.as_bytes()) {
            return Err(EngineError::forbidden("invalid token signature"));
        }

        let mut payload_parts = payload.splitn(2, '.');
        let step_id_str = payload_parts.next().ok_or_else(|| EngineError::forbidden("malformed token"))?;
        let expires_at_ms: u64 = payload_parts
            .next()
            .ok_or_else(|| EngineError::forbidden("malformed token"))?
            .parse()
            .map_err(|_| EngineError::forbidden("malformed token expiry"))?;

        let step_id = StepId::from_string(step_id_str);
        if step_id != expected_step_id {
            return Err(EngineError::forbidden("token scoped to a different step"));
        }
        if now_ms >= expires_at_ms {
            return Err(EngineError::forbidden("token expired"));
        }

        Ok(TokenClaims { step_id, expires_at_ms })
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
    }
}

/// Avoids short-circuiting on the first differing byte (timing side-channel
/// hardening for signature comparison).
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
#[path = "control_token_tests.rs"]
mod tests;
