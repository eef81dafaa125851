//! API domains, APIs and the fixed standard-scope enumeration.
//!
//! An [`ApiDomain`] is a namespace for a family of APIs (typically a base
//! URI). An [`Api`] belongs to exactly one domain, declares which standard
//! claim scopes its tokens require, and carries the audience string that
//! ends up in the `aud` claim of tokens minted for it. Identifier fields
//! are generated once at creation and frozen afterwards.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{Error, Result};

/// Fixed enumeration of standard claim scopes an API may require.
///
/// The set of required scopes for an [`Api`] is always drawn from this
/// enumeration; the type makes the subset invariant unrepresentable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardScope {
    /// E-mail address claims.
    Email,
    /// Profile claims (names, preferred username).
    Profile,
    /// Postal address claims.
    Address,
    /// GitHub username from a linked social account.
    GithubUsername,
}

impl StandardScope {
    /// All members, in declaration order.
    pub const ALL: [StandardScope; 4] = [
        StandardScope::Email,
        StandardScope::Profile,
        StandardScope::Address,
        StandardScope::GithubUsername,
    ];

    /// Scope identifier as it appears in OAuth scope strings.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            StandardScope::Email => "email",
            StandardScope::Profile => "profile",
            StandardScope::Address => "address",
            StandardScope::GithubUsername => "github_username",
        }
    }

    /// Parse a scope identifier; unknown identifiers yield `None`
    /// (callers silently skip them, they are never an error).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scope| scope.as_str() == s)
    }
}

impl fmt::Display for StandardScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn api_name_regex() -> &'static Regex {
    static API_NAME_RE: OnceLock<Regex> = OnceLock::new();
    API_NAME_RE.get_or_init(|| Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*$").unwrap())
}

/// A namespace for a family of APIs, e.g. `https://api.example.com/auth`.
///
/// Immutable once an [`Api`] references it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiDomain {
    identifier: String,
}

impl ApiDomain {
    /// Create a domain from its namespace identifier.
    ///
    /// The identifier must be non-empty, contain no whitespace and carry
    /// no trailing slash (it is joined with API names by `/`).
    pub fn new(identifier: impl Into<String>) -> Result<Self> {
        let identifier = identifier.into();
        if identifier.is_empty() || identifier.chars().any(char::is_whitespace) {
            return Err(Error::InvalidIdentifier {
                value: identifier,
                reason: "domain identifier must be non-empty without whitespace".to_string(),
            });
        }
        if identifier.ends_with('/') {
            return Err(Error::InvalidIdentifier {
                value: identifier,
                reason: "domain identifier must not end with '/'".to_string(),
            });
        }
        Ok(Self { identifier })
    }

    /// The namespace identifier.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }
}

/// A downstream API registered with the permission graph.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Api {
    identifier: String,
    domain: String,
    name: String,
    audience: String,
    required_scopes: BTreeSet<StandardScope>,
}

impl Api {
    /// Register an API under a domain.
    ///
    /// `name` must be unique within the domain and match
    /// `^[a-z0-9]+(-[a-z0-9]+)*$`. The composite identifier
    /// `"{domain}/{name}"` is generated here and never changes.
    pub fn new(
        domain: &ApiDomain,
        name: impl Into<String>,
        audience: impl Into<String>,
        required_scopes: impl IntoIterator<Item = StandardScope>,
    ) -> Result<Self> {
        let name = name.into();
        if !api_name_regex().is_match(&name) {
            return Err(Error::InvalidIdentifier {
                value: name,
                reason: "API name may contain only lower case letters, digits and dashes"
                    .to_string(),
            });
        }
        let audience = audience.into();
        if audience.is_empty() {
            return Err(Error::InvalidIdentifier {
                value: audience,
                reason: "audience must be non-empty".to_string(),
            });
        }
        Ok(Self {
            identifier: format!("{}/{}", domain.identifier(), name),
            domain: domain.identifier().to_string(),
            name,
            audience,
            required_scopes: required_scopes.into_iter().collect(),
        })
    }

    /// Composite identifier `"{domain}/{name}"`, frozen at creation.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// The owning domain's identifier.
    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Name, unique within the domain.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Audience string carried in tokens minted for this API.
    #[must_use]
    pub fn audience(&self) -> &str {
        &self.audience
    }

    /// Standard scopes this API's tokens require.
    #[must_use]
    pub fn required_scopes(&self) -> &BTreeSet<StandardScope> {
        &self.required_scopes
    }

    /// Required scopes as OAuth scope strings, in enumeration order.
    #[must_use]
    pub fn required_scope_names(&self) -> Vec<String> {
        self.required_scopes
            .iter()
            .map(|s| s.as_str().to_string())
            .collect()
    }

    /// Required scopes absent from `granted`.
    ///
    /// A non-empty result is reported as a diagnostic warning; whether the
    /// API is still issued a token is the partial-grant policy's call.
    #[must_use]
    pub fn missing_scopes(&self, granted: &[String]) -> Vec<StandardScope> {
        let missing: Vec<StandardScope> = self
            .required_scopes
            .iter()
            .filter(|scope| !granted.iter().any(|g| g == scope.as_str()))
            .copied()
            .collect();
        if !missing.is_empty() {
            warn!(
                api = %self.identifier,
                missing = ?missing.iter().map(|s| s.as_str()).collect::<Vec<_>>(),
                "API requires scopes that were not granted"
            );
        }
        missing
    }
}
