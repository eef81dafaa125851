//! Token issuance, verification and ID-token extension.
//!
//! [`TokenIssuer`] mints the per-API access tokens, [`TokenVerifier`]
//! checks externally-presented ones against the key store, and
//! [`IdTokenExtender`] is the orchestrator the web layer calls after a
//! successful OAuth authorization.

pub mod extender;
pub mod issuer;
pub mod verifier;

pub use extender::IdTokenExtender;
pub use issuer::TokenIssuer;
pub use verifier::TokenVerifier;

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current Unix time in seconds.
pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_secs()
}
