//! Identity inputs consumed by the token pipeline.
//!
//! The pipeline never authenticates anybody. The surrounding OIDC layer
//! hands it a [`User`] and a [`ClientApp`] that have already passed the
//! OAuth authorization flow; both are plain value types here. Linked
//! social accounts are read through the [`SocialAccountStore`] seam so a
//! failing account backend is observable as an error rather than silently
//! producing incomplete claims.

pub mod api;
pub mod scope;

pub use api::{Api, ApiDomain, StandardScope};
pub use scope::{ApiScope, ScopeTranslation};

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// An authenticated end user as seen by the token pipeline.
///
/// `sub` is the stable unique id used as the token subject. Profile
/// fields feed the standard OIDC claim source; anything else about the
/// user lives in the surrounding identity layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Stable unique id, used as the `sub` claim.
    pub sub: Uuid,
    /// Login name, exposed as `preferred_username` under the profile scope.
    pub username: String,
    /// E-mail address, exposed under the email scope.
    pub email: String,
    /// Given name (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    /// Family name (optional).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

impl User {
    /// Full display name assembled from the name parts, if any are set.
    #[must_use]
    pub fn full_name(&self) -> Option<String> {
        match (self.given_name.as_deref(), self.family_name.as_deref()) {
            (Some(given), Some(family)) => Some(format!("{given} {family}")),
            (Some(given), None) => Some(given.to_string()),
            (None, Some(family)) => Some(family.to_string()),
            (None, None) => None,
        }
    }
}

/// A linked third-party account (e.g. a GitHub login).
///
/// `extra` is the provider-specific data mapping as delivered by the
/// provider; claim sources pick individual keys out of it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SocialAccount {
    /// Provider name, e.g. `"github"`.
    pub provider: String,
    /// Provider-specific extra data.
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// An OAuth client application requesting tokens.
///
/// Which API scopes the client may receive is stored inverted on each
/// [`ApiScope`]'s allow-list, so this stays a thin identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientApp {
    /// OAuth client id, used as the `azp` claim and the first `aud` entry.
    pub client_id: String,
}

impl ClientApp {
    /// Create a client identity from its OAuth client id.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
        }
    }
}

/// Lookup seam for a user's linked social accounts.
///
/// Implementations must distinguish "no linked accounts" (empty `Vec`)
/// from a failing backend (an error) — the claims layer treats the former
/// as an empty contribution and propagates the latter.
pub trait SocialAccountStore: Send + Sync {
    /// Return the user's linked accounts in link order.
    fn accounts_for(&self, user: &User) -> Result<Vec<SocialAccount>>;
}

/// In-memory social account store keyed by user id.
#[derive(Default)]
pub struct InMemorySocialAccounts {
    accounts: HashMap<Uuid, Vec<SocialAccount>>,
}

impl InMemorySocialAccounts {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Link an account to a user, appended after any existing links.
    pub fn link(&mut self, user: &User, account: SocialAccount) {
        self.accounts.entry(user.sub).or_default().push(account);
    }
}

impl SocialAccountStore for InMemorySocialAccounts {
    fn accounts_for(&self, user: &User) -> Result<Vec<SocialAccount>> {
        Ok(self.accounts.get(&user.sub).cloned().unwrap_or_default())
    }
}

/// A store that always fails; stands in for an unreachable account
/// backend in tests.
pub struct UnavailableSocialAccounts;

impl SocialAccountStore for UnavailableSocialAccounts {
    fn accounts_for(&self, _user: &User) -> Result<Vec<SocialAccount>> {
        Err(Error::Upstream("social account store unavailable".into()))
    }
}
