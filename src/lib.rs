//! Permission-scoped API token issuance for OpenID Connect providers.
//!
//! This crate extends a standard OIDC identity provider with a
//! multi-audience token issuance layer. It runs *after* a user/client pair
//! has been authenticated and authorized at the OAuth layer, and provides:
//!
//! - **Claims aggregation**: independent claim sources composed in a fixed
//!   priority order into one userinfo mapping
//! - **Permission resolution**: a permission graph rooted at client
//!   applications decides which downstream APIs and fine-grained scopes a
//!   client/user pair may receive
//! - **Per-API tokens**: compact RS256 tokens minted per downstream API,
//!   carrying only the claims and scopes that API is entitled to
//! - **Verification**: externally-issued tokens validated against signing
//!   keys fetched and cached from a remote key-set (JWKS) endpoint
//!
//! The surrounding web layer owns sessions, login views and the OAuth
//! endpoints; this crate only consumes an authenticated [`model::User`] and
//! [`model::ClientApp`] and hands back signed tokens and claims mappings.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod claims;
pub mod config;
pub mod error;
pub mod graph;
pub mod keys;
pub mod model;
pub mod token;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
