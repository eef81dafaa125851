//! Claim sources and the aggregation contract.
//!
//! # Design
//!
//! A claim source is anything that can contribute key/value facts about a
//! user to a userinfo mapping: the standard OIDC claims, a linked social
//! account, a registry of API scope descriptors. Sources implement one
//! capability interface and are iterated by the [`ClaimsAggregator`] in a
//! fixed, declared priority order — no subclass hierarchy, no adapter
//! objects. Every source receives the same [`ClaimContext`] value struct.
//!
//! Two rules every source must follow:
//!
//! - **Absent data is not an error.** No linked account, no matching
//!   scope, no translation — all yield an empty contribution.
//! - **Broken dependencies are errors.** A source whose upstream store is
//!   unreachable must fail, not silently contribute nothing.

pub mod aggregator;
pub mod api_scopes;
pub mod social;
pub mod standard;

pub use aggregator::ClaimsAggregator;
pub use api_scopes::ApiScopeInfoSource;
pub use social::SocialAccountClaims;
pub use standard::StandardClaims;

use serde::Serialize;

use crate::Result;
use crate::model::{ClientApp, StandardScope, User};

/// Claims mapping. `serde_json`'s map keeps keys ordered, so aggregation
/// output is deterministic and directly serializable into a token payload.
pub type ClaimsMap = serde_json::Map<String, serde_json::Value>;

/// Everything a claim source may look at for one build call.
///
/// Plain value context passed explicitly to every source; `client` is
/// absent when claims are built outside an OAuth request (e.g. for a
/// per-API token).
#[derive(Clone, Copy)]
pub struct ClaimContext<'a> {
    /// The authenticated user.
    pub user: &'a User,
    /// Granted scope identifiers, in grant order.
    pub scopes: &'a [String],
    /// The requesting client application, if any.
    pub client: Option<&'a ClientApp>,
}

impl ClaimContext<'_> {
    /// Whether a standard scope was granted.
    #[must_use]
    pub fn has_scope(&self, scope: StandardScope) -> bool {
        self.scopes.iter().any(|s| s == scope.as_str())
    }
}

/// Descriptor record for a known scope, as served to consent screens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScopeInfo {
    /// Scope identifier.
    pub scope: String,
    /// Human-readable name (possibly empty when untranslated).
    pub name: String,
    /// Human-readable description (possibly empty when untranslated).
    pub description: String,
}

/// Capability interface implemented by every claim source.
pub trait ClaimSource: Send + Sync {
    /// Stable source name, used in logs.
    fn name(&self) -> &'static str;

    /// Descriptors for the scopes this source knows, out of `scopes`.
    /// Unknown scopes are silently skipped. `language` selects
    /// translation texts where the source has them.
    fn scopes_info(&self, _scopes: &[String], _language: &str) -> Vec<ScopeInfo> {
        Vec::new()
    }

    /// Build this source's claims contribution for the context.
    fn build(&self, ctx: &ClaimContext<'_>) -> Result<ClaimsMap>;
}
