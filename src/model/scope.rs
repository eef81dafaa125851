//! API scopes — fine-grained permissions with generated identifiers.
//!
//! An [`ApiScope`] is the grant unit clients request in their OAuth scope:
//! general access to an API, or a specific kind of access distinguished by
//! a *specifier* (`read`, `write`, ...). Its identifier is derived from
//! the owning API's identifier and the specifier exactly once, at
//! creation, and is frozen afterwards — the permission graph rejects any
//! later attempt to change it.
//!
//! Human-readable name/description texts are kept per language code, one
//! record per language. Lookup falls back to the configured default
//! language and never fails: a scope with no usable translation simply
//! yields empty texts.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::api::Api;
use crate::{Error, Result};

fn specifier_regex() -> &'static Regex {
    static SPECIFIER_RE: OnceLock<Regex> = OnceLock::new();
    SPECIFIER_RE.get_or_init(|| {
        // Dot-separated segments of lowercase alphanumerics and dashes.
        Regex::new(r"^[a-z0-9]+(-[a-z0-9]+)*(\.[a-z0-9]+(-[a-z0-9]+)*)*$").unwrap()
    })
}

/// Reduce free-form specifier input to identifier-safe segments:
/// lowercase, whitespace/underscores to dashes, other characters dropped,
/// runs of dashes collapsed.
fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    for ch in input.trim().chars() {
        let ch = ch.to_ascii_lowercase();
        match ch {
            'a'..='z' | '0'..='9' | '.' => slug.push(ch),
            ' ' | '\t' | '_' | '-' => {
                if !slug.ends_with('-') && !slug.is_empty() {
                    slug.push('-');
                }
            }
            _ => {}
        }
    }
    slug.trim_matches('-').to_string()
}

/// Name and description texts for one language.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeTranslation {
    /// Human-readable name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
}

/// A fine-grained permission on one API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiScope {
    identifier: String,
    api_identifier: String,
    specifier: String,
    translations: BTreeMap<String, ScopeTranslation>,
    allowed_clients: BTreeSet<String>,
}

impl ApiScope {
    /// Create a scope on `api` with an optional specifier.
    ///
    /// The identifier is the API identifier itself, or
    /// `"{api identifier}.{specifier}"` when a specifier is given. The
    /// specifier is slugified first; input that leaves no valid slug
    /// (or produces one violating the identifier pattern) is rejected
    /// here, at creation time — never at token issuance.
    pub(crate) fn new(api: &Api, specifier: &str) -> Result<Self> {
        let slug = slugify(specifier);
        if !specifier.trim().is_empty() && slug.is_empty() {
            return Err(Error::InvalidIdentifier {
                value: specifier.to_string(),
                reason: "specifier has no identifier-safe characters".to_string(),
            });
        }
        if !slug.is_empty() && !specifier_regex().is_match(&slug) {
            return Err(Error::InvalidIdentifier {
                value: slug,
                reason: "specifier segments may contain only lower case letters, \
                         digits and dashes, separated by dots"
                    .to_string(),
            });
        }

        let identifier = if slug.is_empty() {
            api.identifier().to_string()
        } else {
            format!("{}.{slug}", api.identifier())
        };

        Ok(Self {
            identifier,
            api_identifier: api.identifier().to_string(),
            specifier: slug,
            translations: BTreeMap::new(),
            allowed_clients: BTreeSet::new(),
        })
    }

    /// Generated identifier, frozen at creation.
    #[must_use]
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Identifier of the owning API, frozen at creation.
    #[must_use]
    pub fn api_identifier(&self) -> &str {
        &self.api_identifier
    }

    /// Specifier slug (empty for general API access), frozen at creation.
    #[must_use]
    pub fn specifier(&self) -> &str {
        &self.specifier
    }

    /// Allow a client application to receive this scope.
    pub(crate) fn allow_client(&mut self, client_id: impl Into<String>) {
        self.allowed_clients.insert(client_id.into());
    }

    /// Whether `client_id` is allow-listed for this scope.
    #[must_use]
    pub fn is_allowed(&self, client_id: &str) -> bool {
        self.allowed_clients.contains(client_id)
    }

    /// Client ids allow-listed for this scope.
    #[must_use]
    pub fn allowed_clients(&self) -> &BTreeSet<String> {
        &self.allowed_clients
    }

    /// Insert or replace the texts for one language. The map key keeps
    /// translations unique per (scope, language).
    pub(crate) fn set_translation(
        &mut self,
        language: impl Into<String>,
        translation: ScopeTranslation,
    ) {
        self.translations.insert(language.into(), translation);
    }

    /// Texts for `language`, falling back to `default_language`, then to
    /// any available translation. `None` only when no translation exists
    /// at all — absence is not an error.
    #[must_use]
    pub fn translation(&self, language: &str, default_language: &str) -> Option<&ScopeTranslation> {
        self.translations
            .get(language)
            .or_else(|| self.translations.get(default_language))
            .or_else(|| self.translations.values().next())
    }
}
