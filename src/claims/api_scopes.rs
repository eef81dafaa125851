//! Scope descriptors served from the permission graph.

use std::sync::Arc;

use super::{ClaimContext, ClaimSource, ClaimsMap, ScopeInfo};
use crate::Result;
use crate::graph::PermissionGraph;

/// Descriptor source for registered API scopes.
///
/// Consent screens ask for `{scope, name, description}` records; this
/// source answers for every scope identifier registered in the
/// [`PermissionGraph`], translated with language fallback. It contributes
/// no userinfo claims — per-API tokens are minted by the orchestrator,
/// not merged into the userinfo mapping.
pub struct ApiScopeInfoSource {
    graph: Arc<PermissionGraph>,
    default_language: String,
}

impl ApiScopeInfoSource {
    /// Create a descriptor source over a frozen permission graph.
    #[must_use]
    pub fn new(graph: Arc<PermissionGraph>, default_language: impl Into<String>) -> Self {
        Self {
            graph,
            default_language: default_language.into(),
        }
    }
}

impl ClaimSource for ApiScopeInfoSource {
    fn name(&self) -> &'static str {
        "api_scopes"
    }

    fn scopes_info(&self, scopes: &[String], language: &str) -> Vec<ScopeInfo> {
        scopes
            .iter()
            .filter_map(|identifier| {
                let scope = self.graph.scope(identifier)?;
                let (name, description) = scope
                    .translation(language, &self.default_language)
                    .map_or_else(
                        || (String::new(), String::new()),
                        |t| (t.name.clone(), t.description.clone()),
                    );
                Some(ScopeInfo {
                    scope: identifier.clone(),
                    name,
                    description,
                })
            })
            .collect()
    }

    fn build(&self, _ctx: &ClaimContext<'_>) -> Result<ClaimsMap> {
        Ok(ClaimsMap::new())
    }
}
