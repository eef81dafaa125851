//! Configuration management

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::graph::PartialGrantPolicy;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Issuer URL stamped into every token (`iss` claim)
    pub issuer: String,
    /// Token issuance configuration
    pub token: TokenConfig,
    /// Signing/verification key configuration
    pub keys: KeysConfig,
    /// Claims configuration
    pub claims: ClaimsConfig,
}

/// Token issuance configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Lifetime of issued per-API tokens, in seconds
    pub ttl_secs: u64,
    /// What to do with an API whose required scopes were not all granted
    pub partial_grant: PartialGrantPolicy,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 600,
            partial_grant: PartialGrantPolicy::default(),
        }
    }
}

/// One configured signing key: inline PEM or a file path.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SigningKeyConfig {
    /// Key id placed in token headers
    pub kid: String,
    /// RSA private key PEM, inline
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pem: Option<String>,
    /// Path to an RSA private key PEM file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pem_file: Option<PathBuf>,
}

/// Signing/verification key configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Local signing keys, first one active
    pub signing: Vec<SigningKeyConfig>,
    /// Remote key-set (JWKS) URL for verification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks_url: Option<String>,
    /// Timeout for remote key-set fetches, in seconds
    pub fetch_timeout_secs: u64,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            signing: Vec::new(),
            jwks_url: None,
            fetch_timeout_secs: 10,
        }
    }
}

/// Claims configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaimsConfig {
    /// Fallback language for scope descriptor texts
    pub default_language: String,
}

impl Default for ClaimsConfig {
    fn default() -> Self {
        Self {
            default_language: "en".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from file and environment
    ///
    /// # Errors
    ///
    /// Returns an error if the config file does not exist or cannot be
    /// parsed.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();

        // Load from file if provided
        if let Some(p) = path {
            if !p.exists() {
                return Err(Error::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            figment = figment.merge(Yaml::file(p));
        }

        // Merge environment variables (OIDC_APITOKEN_ prefix)
        figment = figment.merge(Env::prefixed("OIDC_APITOKEN_").split("__"));

        let config: Self = figment
            .extract()
            .map_err(|e| Error::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would fail deep inside the pipeline.
    fn validate(&self) -> Result<()> {
        for key in &self.keys.signing {
            if key.kid.is_empty() {
                return Err(Error::Config("signing key with empty kid".to_string()));
            }
            if key.pem.is_none() && key.pem_file.is_none() {
                return Err(Error::Config(format!(
                    "signing key '{}' needs either 'pem' or 'pem_file'",
                    key.kid
                )));
            }
        }
        Ok(())
    }
}
