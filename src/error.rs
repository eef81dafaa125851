//! Error types for the token pipeline

use std::io;

use thiserror::Error;

/// Result type alias for the token pipeline
pub type Result<T> = std::result::Result<T, Error>;

/// Token pipeline errors
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No signing key configured — issuance must abort rather than
    /// produce an unsigned token
    #[error("No signing key configured")]
    NoSigningKey,

    /// Token header carries no `kid`
    #[error("Token missing 'kid' field in header")]
    MissingKeyId,

    /// Verification key id not found, even after refetching the key set
    #[error("Unknown key id: {0}")]
    UnknownKey(String),

    /// Key-set URL failed the scheme/host policy; rejected before any
    /// network access
    #[error("Insecure key-set URL: {0}")]
    InsecureUrl(String),

    /// Identifier failed pattern validation at creation time
    #[error("Invalid identifier {value:?}: {reason}")]
    InvalidIdentifier {
        /// The offending value
        value: String,
        /// Why it was rejected
        reason: String,
    },

    /// Attempt to mutate a field that is frozen after creation
    #[error("Field '{0}' is immutable once set")]
    ImmutableField(&'static str),

    /// Identifier already registered
    #[error("Duplicate identifier: {0}")]
    DuplicateIdentifier(String),

    /// Referenced API domain is not registered
    #[error("Unknown API domain: {0}")]
    UnknownDomain(String),

    /// Referenced API is not registered
    #[error("Unknown API: {0}")]
    UnknownApi(String),

    /// Referenced API scope is not registered
    #[error("Unknown API scope: {0}")]
    UnknownScope(String),

    /// A claim source's upstream data dependency failed (distinct from
    /// "no matching data", which is an empty contribution)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// JWT error
    #[error("JWT error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}
