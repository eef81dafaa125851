//! Composition of claim sources into one userinfo mapping.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::{ClaimContext, ClaimSource, ClaimsMap, ScopeInfo, StandardClaims};
use crate::Result;
use crate::model::{ClientApp, User};

/// Composes the standard OIDC claim source with every registered source
/// into one merged claims mapping.
///
/// Sources run in a fixed priority order: standard claims first, then
/// registered sources in registration order. On a key collision the later
/// source wins — deliberately including the case where a custom source
/// overwrites a standard OIDC claim.
pub struct ClaimsAggregator {
    sources: Vec<Arc<dyn ClaimSource>>,
}

impl ClaimsAggregator {
    /// Create an aggregator holding only the standard claim source.
    #[must_use]
    pub fn new() -> Self {
        Self {
            sources: vec![Arc::new(StandardClaims::new())],
        }
    }

    /// Append a source after all previously registered ones. Order of
    /// registration is the merge priority order.
    #[must_use]
    pub fn with_source(mut self, source: Arc<dyn ClaimSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Build the merged claims mapping for `(user, scopes, client)`.
    ///
    /// Aggregation is pure over its inputs: repeating the call yields an
    /// identical mapping. Sources with no matching data contribute empty
    /// maps; a source whose upstream dependency fails aborts the whole
    /// aggregation.
    pub fn aggregate(
        &self,
        user: &User,
        scopes: &[String],
        client: Option<&ClientApp>,
    ) -> Result<ClaimsMap> {
        let ctx = ClaimContext {
            user,
            scopes,
            client,
        };

        let mut merged = ClaimsMap::new();
        for source in &self.sources {
            let contribution = source.build(&ctx)?;
            if !contribution.is_empty() {
                debug!(
                    source = source.name(),
                    claims = contribution.len(),
                    "Merging claim source contribution"
                );
            }
            for (key, value) in contribution {
                // Last writer wins.
                merged.insert(key, value);
            }
        }
        Ok(merged)
    }

    /// Descriptor records for `scopes`, in input order.
    ///
    /// Each source contributes descriptors for the scopes it knows; a
    /// later source overrides an earlier one's descriptor for the same
    /// scope. Scopes no source knows are silently omitted.
    #[must_use]
    pub fn scopes_info(&self, scopes: &[String], language: &str) -> Vec<ScopeInfo> {
        let mut by_scope: BTreeMap<String, ScopeInfo> = BTreeMap::new();
        for source in &self.sources {
            for info in source.scopes_info(scopes, language) {
                by_scope.insert(info.scope.clone(), info);
            }
        }
        scopes
            .iter()
            .filter_map(|scope| by_scope.get(scope).cloned())
            .collect()
    }
}

impl Default for ClaimsAggregator {
    fn default() -> Self {
        Self::new()
    }
}

/// The aggregator is itself a claim source, so composed aggregators can
/// be registered inside one another like any other source.
impl ClaimSource for ClaimsAggregator {
    fn name(&self) -> &'static str {
        "combined"
    }

    fn scopes_info(&self, scopes: &[String], language: &str) -> Vec<ScopeInfo> {
        ClaimsAggregator::scopes_info(self, scopes, language)
    }

    fn build(&self, ctx: &ClaimContext<'_>) -> Result<ClaimsMap> {
        self.aggregate(ctx.user, ctx.scopes, ctx.client)
    }
}
