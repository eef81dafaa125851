//! Verification of externally-presented tokens.

use std::sync::Arc;

use jsonwebtoken::Validation;

use crate::claims::ClaimsMap;
use crate::keys::{KeyStore, SIGNING_ALGORITHM};
use crate::{Error, Result};

/// Verifies compact signed tokens against the key store.
///
/// The token header names its key via `kid`; the key store resolves it
/// from the cache, fetching the remote key set once on a miss. Signature
/// and expiry are validated; audience checking is the caller's business
/// (the claims are handed back for it).
pub struct TokenVerifier {
    keystore: Arc<KeyStore>,
}

impl TokenVerifier {
    /// Create a verifier over a shared key store.
    #[must_use]
    pub fn new(keystore: Arc<KeyStore>) -> Self {
        Self { keystore }
    }

    /// Verify a token and return its claims.
    ///
    /// # Errors
    ///
    /// [`Error::MissingKeyId`] for headers without `kid`,
    /// [`Error::UnknownKey`] when the key set does not know the `kid`
    /// even after a refetch, [`Error::Jwt`] for signature or claim
    /// validation failures.
    pub async fn verify(&self, token: &str) -> Result<ClaimsMap> {
        let header = jsonwebtoken::decode_header(token)?;
        let kid = header.kid.ok_or(Error::MissingKeyId)?;

        let key = self.keystore.verification_key(&kid).await?;

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.validate_aud = false;
        validation.leeway = 60; // 60-second clock skew tolerance

        let data = jsonwebtoken::decode::<ClaimsMap>(token, &key, &validation)?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn token_without_kid_is_rejected_before_key_lookup() {
        // GIVEN: a verifier with no keys at all and a kid-less token
        let keystore = Arc::new(KeyStore::new(Vec::new(), None, Duration::from_secs(10)));
        let verifier = TokenVerifier::new(keystore);

        // HS256 token with no kid header (signature irrelevant here)
        let token = concat!(
            "eyJhbGciOiJSUzI1NiIsInR5cCI6IkpXVCJ9.",
            "eyJzdWIiOiJ1c2VyLTEifQ.",
            "c2ln"
        );

        // THEN: missing kid is its own error
        assert!(matches!(
            verifier.verify(token).await,
            Err(Error::MissingKeyId)
        ));
    }

    #[tokio::test]
    async fn garbage_token_is_a_jwt_error() {
        let keystore = Arc::new(KeyStore::new(Vec::new(), None, Duration::from_secs(10)));
        let verifier = TokenVerifier::new(keystore);

        assert!(matches!(
            verifier.verify("not-a-token").await,
            Err(Error::Jwt(_))
        ));
    }
}
