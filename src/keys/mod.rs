//! Signing and verification key management.
//!
//! # Design
//!
//! One [`KeyStore`] instance owns both sides of the key lifecycle:
//!
//! - **Signing**: zero or more local RSA keys loaded from PEM. The first
//!   configured key is the active one — issuing-side rotation is out of
//!   scope, so the single-key assumption is explicit. Signing with no key
//!   configured is a hard configuration error, never an unsigned token.
//! - **Verification**: an in-process `kid → DecodingKey` cache filled
//!   from a remote key-set (JWKS) endpoint. A cache miss triggers one
//!   fetch that populates *every* usable key in the response, so a
//!   rotated key set warms the cache in a single round trip.
//!
//! The cache is a `DashMap`: reads are lock-free in the common hit path,
//! and no lock is held across the network call. Concurrent misses may
//! fetch the key set more than once; key material for a given `kid` is
//! immutable, so last-writer-wins inserts are harmless.
//!
//! The fetch URL passes [`url_policy::validate_jwks_url`] before every
//! request — `https`, or `http` to loopback hosts only.

pub mod url_policy;

pub use url_policy::validate_jwks_url;

use std::time::Duration;

use dashmap::DashMap;
use jsonwebtoken::jwk::{AlgorithmParameters, Jwk, JwkSet};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header};
use tracing::debug;

use crate::claims::ClaimsMap;
use crate::config::KeysConfig;
use crate::{Error, Result};

/// Signature algorithm used for all locally-issued tokens.
pub const SIGNING_ALGORITHM: Algorithm = Algorithm::RS256;

/// A local signing key: RSA private key material plus its key id.
pub struct SigningKey {
    kid: String,
    key: EncodingKey,
}

impl SigningKey {
    /// Load a signing key from an RSA private key in PEM form.
    pub fn from_rsa_pem(kid: impl Into<String>, pem: &[u8]) -> Result<Self> {
        let key = EncodingKey::from_rsa_pem(pem)
            .map_err(|e| Error::Config(format!("invalid RSA private key PEM: {e}")))?;
        Ok(Self {
            kid: kid.into(),
            key,
        })
    }

    /// The key id placed in token headers.
    #[must_use]
    pub fn kid(&self) -> &str {
        &self.kid
    }
}

/// Owns local signing keys and the remote verification key cache.
///
/// Constructed once at process start and shared by handle; there is no
/// ambient global key state.
pub struct KeyStore {
    signing: Vec<SigningKey>,
    jwks_url: Option<String>,
    cache: DashMap<String, DecodingKey>,
    http: reqwest::Client,
}

impl KeyStore {
    /// Create a key store from loaded signing keys and an optional
    /// remote key-set URL for verification.
    #[must_use]
    pub fn new(signing: Vec<SigningKey>, jwks_url: Option<String>, fetch_timeout: Duration) -> Self {
        Self {
            signing,
            jwks_url,
            cache: DashMap::new(),
            // The URL policy decides schemes (loopback http stays legal
            // for development setups), so no https_only here.
            http: reqwest::Client::builder()
                .timeout(fetch_timeout)
                .build()
                .unwrap_or_default(),
        }
    }

    /// Build a key store from configuration, loading PEM material from
    /// inline values or files.
    pub fn from_config(config: &KeysConfig) -> Result<Self> {
        let mut signing = Vec::with_capacity(config.signing.len());
        for entry in &config.signing {
            let pem = match (&entry.pem, &entry.pem_file) {
                (Some(pem), _) => pem.clone(),
                (None, Some(path)) => std::fs::read_to_string(path)?,
                (None, None) => {
                    return Err(Error::Config(format!(
                        "signing key '{}' needs either 'pem' or 'pem_file'",
                        entry.kid
                    )));
                }
            };
            signing.push(SigningKey::from_rsa_pem(&entry.kid, pem.as_bytes())?);
        }
        Ok(Self::new(
            signing,
            config.jwks_url.clone(),
            Duration::from_secs(config.fetch_timeout_secs),
        ))
    }

    /// The active signing key: the first configured one.
    ///
    /// # Errors
    ///
    /// [`Error::NoSigningKey`] when none is configured.
    pub fn active_key(&self) -> Result<&SigningKey> {
        self.signing.first().ok_or(Error::NoSigningKey)
    }

    /// Sign a payload into a compact token with the active key.
    ///
    /// The header carries the fixed algorithm and the key's `kid`.
    pub fn sign(&self, payload: &ClaimsMap) -> Result<String> {
        let active = self.active_key()?;
        let mut header = Header::new(SIGNING_ALGORITHM);
        header.kid = Some(active.kid.clone());
        Ok(jsonwebtoken::encode(&header, payload, &active.key)?)
    }

    /// Resolve a verification key by `kid`.
    ///
    /// Consults the cache; on a miss fetches the remote key set once,
    /// populates all keys found, and re-checks. A `kid` still absent
    /// after the refetch is [`Error::UnknownKey`].
    pub async fn verification_key(&self, kid: &str) -> Result<DecodingKey> {
        if let Some(key) = self.cache.get(kid) {
            return Ok(key.value().clone());
        }

        self.fetch_remote_keys().await?;

        self.cache
            .get(kid)
            .map(|key| key.value().clone())
            .ok_or_else(|| Error::UnknownKey(kid.to_string()))
    }

    /// Fetch the configured remote key set and cache every usable key.
    async fn fetch_remote_keys(&self) -> Result<()> {
        let url = self
            .jwks_url
            .as_deref()
            .ok_or_else(|| Error::Config("no key-set URL configured".to_string()))?;
        let url = validate_jwks_url(url)?;

        debug!(%url, "Fetching remote key set");
        let jwks: JwkSet = self.http.get(url.as_str()).send().await?.json().await?;

        let mut cached = 0usize;
        for jwk in &jwks.keys {
            let Some(kid) = jwk.common.key_id.clone() else {
                continue;
            };
            if let Some(key) = decoding_key_for(jwk) {
                self.cache.insert(kid, key);
                cached += 1;
            }
        }
        debug!(keys = cached, "Remote key set cached");
        Ok(())
    }

    /// Number of verification keys currently cached.
    #[must_use]
    pub fn cached_key_count(&self) -> usize {
        self.cache.len()
    }
}

/// Convert a JWK into a `DecodingKey`, if the key type is usable for
/// asymmetric verification.
fn decoding_key_for(jwk: &Jwk) -> Option<DecodingKey> {
    match &jwk.algorithm {
        AlgorithmParameters::RSA(rsa) => DecodingKey::from_rsa_components(&rsa.n, &rsa.e).ok(),
        AlgorithmParameters::EllipticCurve(ec) => {
            DecodingKey::from_ec_components(&ec.x, &ec.y).ok()
        }
        AlgorithmParameters::OctetKey(_) | AlgorithmParameters::OctetKeyPair(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    // 2048-bit RSA key generated for tests only.
    const TEST_PRIVATE_KEY_PEM: &str = include_str!("../../tests/data/test_rsa.pem");

    fn store_with_key() -> KeyStore {
        let key = SigningKey::from_rsa_pem("test-key-1", TEST_PRIVATE_KEY_PEM.as_bytes()).unwrap();
        KeyStore::new(vec![key], None, Duration::from_secs(10))
    }

    fn payload() -> ClaimsMap {
        let mut map = ClaimsMap::new();
        map.insert("sub".to_string(), Value::String("user-1".to_string()));
        map.insert("exp".to_string(), Value::from(4_102_444_800u64));
        map
    }

    #[test]
    fn sign_without_key_is_a_configuration_error() {
        // GIVEN: a store with no signing keys
        let store = KeyStore::new(Vec::new(), None, Duration::from_secs(10));

        // THEN: signing aborts instead of producing an unsigned token
        assert!(matches!(store.sign(&payload()), Err(Error::NoSigningKey)));
    }

    #[test]
    fn sign_produces_compact_token_with_kid_header() {
        // GIVEN: a store with one key
        let store = store_with_key();

        // WHEN: a payload is signed
        let token = store.sign(&payload()).unwrap();

        // THEN: three segments, header carrying the key id
        assert_eq!(token.split('.').count(), 3);
        let header = jsonwebtoken::decode_header(&token).unwrap();
        assert_eq!(header.kid.as_deref(), Some("test-key-1"));
        assert_eq!(header.alg, SIGNING_ALGORITHM);
    }

    #[test]
    fn first_configured_key_is_active() {
        let first = SigningKey::from_rsa_pem("first", TEST_PRIVATE_KEY_PEM.as_bytes()).unwrap();
        let second = SigningKey::from_rsa_pem("second", TEST_PRIVATE_KEY_PEM.as_bytes()).unwrap();
        let store = KeyStore::new(vec![first, second], None, Duration::from_secs(10));

        assert_eq!(store.active_key().unwrap().kid(), "first");
    }

    #[test]
    fn invalid_pem_is_a_configuration_error() {
        let result = SigningKey::from_rsa_pem("bad", b"not a pem");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn from_config_loads_pem_from_file() {
        // GIVEN: a key configured via pem_file
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(TEST_PRIVATE_KEY_PEM.as_bytes()).unwrap();

        let config = crate::config::KeysConfig {
            signing: vec![crate::config::SigningKeyConfig {
                kid: "file-key".to_string(),
                pem: None,
                pem_file: Some(file.path().to_path_buf()),
            }],
            jwks_url: None,
            fetch_timeout_secs: 5,
        };

        // WHEN: the store is built
        let store = KeyStore::from_config(&config).unwrap();

        // THEN: the key is loaded and active
        assert_eq!(store.active_key().unwrap().kid(), "file-key");
    }

    #[test]
    fn from_config_rejects_entry_without_material() {
        let config = crate::config::KeysConfig {
            signing: vec![crate::config::SigningKeyConfig {
                kid: "empty".to_string(),
                pem: None,
                pem_file: None,
            }],
            jwks_url: None,
            fetch_timeout_secs: 5,
        };

        assert!(matches!(KeyStore::from_config(&config), Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn verification_without_jwks_url_is_a_configuration_error() {
        // GIVEN: a store with no key-set URL
        let store = store_with_key();

        // THEN: a cache miss cannot fetch and reports configuration
        assert!(matches!(
            store.verification_key("test-key-1").await,
            Err(Error::Config(_))
        ));
    }

    #[tokio::test]
    async fn insecure_jwks_url_fails_before_network() {
        // GIVEN: a non-loopback http key-set URL
        let store = KeyStore::new(
            Vec::new(),
            Some("http://169.0.0.1/openid/jwks".to_string()),
            Duration::from_secs(10),
        );

        // THEN: the policy rejects before any request is attempted
        assert!(matches!(
            store.verification_key("any").await,
            Err(Error::InsecureUrl(_))
        ));
    }
}
