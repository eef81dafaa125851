//! Permission graph — which scopes belong to which API, and which
//! clients may receive them.
//!
//! # Design
//!
//! The graph owns three registries: domains, APIs (keyed by composite
//! identifier) and API scopes (keyed by generated identifier, globally
//! unique). Registration performs all identifier validation; mutation of
//! frozen fields is rejected here so a malformed permission can never
//! surface first at token issuance.
//!
//! [`PermissionGraph::resolve`] answers the per-request question: given a
//! client and the OAuth-granted scope set, which APIs become token
//! audiences and which scope identifiers does each receive. Both filters
//! are mandatory — a scope missing from the grant *or* whose allow-list
//! does not contain the client is silently excluded, never an error.
//!
//! An API whose required standard scopes were not all granted is always
//! warned about; whether it still receives a token is the
//! [`PartialGrantPolicy`]'s call (strict excludes, lenient issues).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{Api, ApiDomain, ApiScope, ClientApp, ScopeTranslation, StandardScope};
use crate::{Error, Result};

/// What to do with an API whose required scopes were not fully granted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartialGrantPolicy {
    /// Warn and exclude the API from the audience list.
    #[default]
    Strict,
    /// Warn but still issue the per-API token.
    Lenient,
}

/// Mutable fields of a registered scope, for administrative updates.
///
/// `specifier` is present so that an attempted change is an explicit
/// [`Error::ImmutableField`] instead of silently regenerating the
/// identifier.
#[derive(Debug, Clone, Default)]
pub struct ScopeUpdate {
    /// Attempted specifier change — always rejected.
    pub specifier: Option<String>,
    /// Translation records to insert or replace, keyed by language.
    pub translations: Vec<(String, ScopeTranslation)>,
    /// Client ids to add to the allow-list.
    pub allow_clients: Vec<String>,
}

/// One API that survived resolution, with the scopes it receives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedApi {
    /// Composite API identifier.
    pub api_identifier: String,
    /// Audience string for tokens minted for this API.
    pub audience: String,
    /// Granted scope identifiers, sorted lexicographically.
    pub scope_identifiers: Vec<String>,
    /// Standard scopes the API requires for its token payload.
    pub included_scopes: Vec<String>,
    /// Required scopes absent from the grant (diagnostic record).
    pub missing_scopes: Vec<StandardScope>,
}

/// Result of resolving a client's granted scope set against the graph.
#[derive(Debug, Clone, Default)]
pub struct ResolvedAccess {
    /// Audience APIs, sorted lexicographically by audience string.
    pub audiences: Vec<ResolvedApi>,
    /// Granted scopes widened with every audience API's required scopes
    /// (grant order preserved, additions appended sorted).
    pub extended_scopes: Vec<String>,
}

impl ResolvedAccess {
    /// All granted scope identifiers across audiences, sorted.
    #[must_use]
    pub fn api_perms(&self) -> Vec<String> {
        let mut perms: Vec<String> = self
            .audiences
            .iter()
            .flat_map(|api| api.scope_identifiers.iter().cloned())
            .collect();
        perms.sort_unstable();
        perms.dedup();
        perms
    }

    /// Audience strings in resolution order (already sorted), deduplicated.
    #[must_use]
    pub fn audience_strings(&self) -> Vec<String> {
        let mut audiences: Vec<String> = self
            .audiences
            .iter()
            .map(|api| api.audience.clone())
            .collect();
        audiences.dedup();
        audiences
    }
}

/// Registry of API domains, APIs and scopes, plus grant resolution.
#[derive(Debug, Default)]
pub struct PermissionGraph {
    domains: BTreeMap<String, ApiDomain>,
    apis: BTreeMap<String, Api>,
    scopes: BTreeMap<String, ApiScope>,
}

impl PermissionGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a domain. Re-registering an identifier is an error.
    pub fn register_domain(&mut self, domain: ApiDomain) -> Result<()> {
        let identifier = domain.identifier().to_string();
        if self.domains.contains_key(&identifier) {
            return Err(Error::DuplicateIdentifier(identifier));
        }
        self.domains.insert(identifier, domain);
        Ok(())
    }

    /// Register an API under an already-registered domain; returns the
    /// generated composite identifier.
    pub fn register_api(
        &mut self,
        domain_identifier: &str,
        name: impl Into<String>,
        audience: impl Into<String>,
        required_scopes: impl IntoIterator<Item = StandardScope>,
    ) -> Result<String> {
        let domain = self
            .domains
            .get(domain_identifier)
            .ok_or_else(|| Error::UnknownDomain(domain_identifier.to_string()))?;
        let api = Api::new(domain, name, audience, required_scopes)?;
        let identifier = api.identifier().to_string();
        if self.apis.contains_key(&identifier) {
            return Err(Error::DuplicateIdentifier(identifier));
        }
        self.apis.insert(identifier.clone(), api);
        Ok(identifier)
    }

    /// Register a scope on an already-registered API; returns the
    /// generated scope identifier, computed once and frozen.
    pub fn register_scope(&mut self, api_identifier: &str, specifier: &str) -> Result<String> {
        let api = self
            .apis
            .get(api_identifier)
            .ok_or_else(|| Error::UnknownApi(api_identifier.to_string()))?;
        let scope = ApiScope::new(api, specifier)?;
        let identifier = scope.identifier().to_string();
        if self.scopes.contains_key(&identifier) {
            return Err(Error::DuplicateIdentifier(identifier));
        }
        self.scopes.insert(identifier.clone(), scope);
        Ok(identifier)
    }

    /// Allow a client application to receive a registered scope.
    pub fn allow_client(&mut self, scope_identifier: &str, client_id: &str) -> Result<()> {
        let scope = self
            .scopes
            .get_mut(scope_identifier)
            .ok_or_else(|| Error::UnknownScope(scope_identifier.to_string()))?;
        scope.allow_client(client_id);
        Ok(())
    }

    /// Insert or replace one language's translation for a scope.
    pub fn set_translation(
        &mut self,
        scope_identifier: &str,
        language: &str,
        translation: ScopeTranslation,
    ) -> Result<()> {
        let scope = self
            .scopes
            .get_mut(scope_identifier)
            .ok_or_else(|| Error::UnknownScope(scope_identifier.to_string()))?;
        scope.set_translation(language, translation);
        Ok(())
    }

    /// Apply an administrative update to a registered scope.
    ///
    /// Translations and allow-list additions are applied; an attempted
    /// specifier change fails with [`Error::ImmutableField`] before
    /// anything else is touched.
    pub fn update_scope(&mut self, scope_identifier: &str, update: ScopeUpdate) -> Result<()> {
        if update.specifier.is_some() {
            return Err(Error::ImmutableField("specifier"));
        }
        let scope = self
            .scopes
            .get_mut(scope_identifier)
            .ok_or_else(|| Error::UnknownScope(scope_identifier.to_string()))?;
        for (language, translation) in update.translations {
            scope.set_translation(language, translation);
        }
        for client_id in update.allow_clients {
            scope.allow_client(client_id);
        }
        Ok(())
    }

    /// Look up a registered scope by identifier.
    #[must_use]
    pub fn scope(&self, identifier: &str) -> Option<&ApiScope> {
        self.scopes.get(identifier)
    }

    /// Look up a registered API by composite identifier.
    #[must_use]
    pub fn api(&self, identifier: &str) -> Option<&Api> {
        self.apis.get(identifier)
    }

    /// Resolve which APIs and scopes `client` receives out of `granted`.
    ///
    /// See the module docs for the algorithm. Output ordering is fully
    /// deterministic: audiences sorted by audience string, scope
    /// identifiers sorted within each API.
    #[must_use]
    pub fn resolve(
        &self,
        client: &ClientApp,
        granted: &[String],
        policy: PartialGrantPolicy,
    ) -> ResolvedAccess {
        // Both filters mandatory: granted AND allow-listed for the client.
        let mut scopes_by_api: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
        for identifier in granted {
            let Some(scope) = self.scopes.get(identifier) else {
                continue;
            };
            if !scope.is_allowed(&client.client_id) {
                debug!(
                    scope = %identifier,
                    client = %client.client_id,
                    "Granted scope not allow-listed for client, excluded"
                );
                continue;
            }
            scopes_by_api
                .entry(scope.api_identifier())
                .or_default()
                .insert(scope.identifier());
        }

        let mut audiences = Vec::with_capacity(scopes_by_api.len());
        for (api_identifier, scope_identifiers) in scopes_by_api {
            let Some(api) = self.apis.get(api_identifier) else {
                continue;
            };
            // Emits the diagnostic warning on its own.
            let missing = api.missing_scopes(granted);
            if !missing.is_empty() && policy == PartialGrantPolicy::Strict {
                continue;
            }
            audiences.push(ResolvedApi {
                api_identifier: api_identifier.to_string(),
                audience: api.audience().to_string(),
                scope_identifiers: scope_identifiers
                    .into_iter()
                    .map(ToString::to_string)
                    .collect(),
                included_scopes: api.required_scope_names(),
                missing_scopes: missing,
            });
        }
        audiences.sort_by(|a, b| a.audience.cmp(&b.audience));

        // Widen the grant with every audience API's required scopes so
        // the aggregator can serve each per-API token its full claim set.
        let mut extended_scopes: Vec<String> = Vec::with_capacity(granted.len());
        for scope in granted {
            if !extended_scopes.contains(scope) {
                extended_scopes.push(scope.clone());
            }
        }
        let additions: BTreeSet<String> = audiences
            .iter()
            .flat_map(|api| api.included_scopes.iter())
            .filter(|scope| !extended_scopes.contains(*scope))
            .cloned()
            .collect();
        extended_scopes.extend(additions);

        ResolvedAccess {
            audiences,
            extended_scopes,
        }
    }
}
