// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Maps the engine's [`ErrorKind`] taxonomy onto control-plane HTTP status
//! codes. Framework-agnostic on purpose: `lazyaf-daemon` wraps
//! this in its own `axum::http::StatusCode` at the handler boundary.

use lazyaf_core::ErrorKind;

pub fn status_code(kind: ErrorKind) -> u16 {
    match kind {
        ErrorKind::NotFound => 404,
        ErrorKind::Conflict => 409,
        ErrorKind::Unauthorized => 401,
        ErrorKind::Forbidden => 403,
        ErrorKind::Transient => 503,
        ErrorKind::ResourceExhausted => 507,
        ErrorKind::Timeout => 504,
        ErrorKind::ImagePullFailure => 502,
        ErrorKind::Protocol => 400,
        ErrorKind::Fatal => 500,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_errors_map_to_spec_codes() {
        assert_eq!(status_code(ErrorKind::Unauthorized), 401);
        assert_eq!(status_code(ErrorKind::Forbidden), 403);
        assert_eq!(status_code(ErrorKind::NotFound), 404);
        assert_eq!(status_code(ErrorKind::Conflict), 409);
    }
}
