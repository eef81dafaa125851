//! Per-API access token issuance.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use super::unix_now;
use crate::Result;
use crate::claims::{ClaimsAggregator, ClaimsMap};
use crate::keys::KeyStore;
use crate::model::User;

/// Mints compact signed tokens scoped to one downstream API.
///
/// The payload is built in three layers: the aggregated claims for the
/// scopes the API is entitled to, then the ID-token skeleton (`iss`,
/// `sub`, `aud`, `iat`, `exp` — the skeleton wins on collision), then the
/// sorted permission list under `perms`. Signing uses the key store's
/// active key; with no key configured issuance aborts.
pub struct TokenIssuer {
    keystore: Arc<KeyStore>,
    aggregator: Arc<ClaimsAggregator>,
    issuer: String,
    ttl: Duration,
}

impl TokenIssuer {
    /// Create an issuer stamping tokens with `issuer` and `ttl`.
    #[must_use]
    pub fn new(
        keystore: Arc<KeyStore>,
        aggregator: Arc<ClaimsAggregator>,
        issuer: impl Into<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            keystore,
            aggregator,
            issuer: issuer.into(),
            ttl,
        }
    }

    /// Issue a signed token for `audience` carrying `permission_identifiers`
    /// and the claims for `included_scopes`.
    ///
    /// Claims are aggregated without a client context: per-API tokens are
    /// not tied to the OAuth request that triggered them.
    pub fn issue(
        &self,
        user: &User,
        audience: &str,
        permission_identifiers: &[String],
        included_scopes: &[String],
    ) -> Result<String> {
        let mut payload = self.aggregator.aggregate(user, included_scopes, None)?;

        let now = unix_now();
        payload.insert("iss".to_string(), Value::String(self.issuer.clone()));
        payload.insert("sub".to_string(), Value::String(user.sub.to_string()));
        payload.insert("aud".to_string(), Value::String(audience.to_string()));
        payload.insert("iat".to_string(), Value::from(now));
        payload.insert("exp".to_string(), Value::from(now + self.ttl.as_secs()));

        let mut perms: Vec<String> = permission_identifiers.to_vec();
        perms.sort_unstable();
        perms.dedup();
        payload.insert("perms".to_string(), Value::from(perms));

        debug!(audience = %audience, user = %user.sub, "Issuing API token");
        self.keystore.sign(&payload)
    }
}
