//! ID-token extension — the pipeline orchestrator.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::TokenIssuer;
use crate::Result;
use crate::claims::{ClaimsAggregator, ClaimsMap};
use crate::graph::{PartialGrantPolicy, PermissionGraph};
use crate::model::{ClientApp, User};

/// Extends a base ID token with aggregated claims, per-API access tokens
/// and the widened audience list.
///
/// This is the entry point the web layer calls once a user/client pair
/// has passed OAuth authorization: resolve the permission graph, widen
/// the scope set, aggregate claims, mint one token per audience API, and
/// layer everything onto a copy of the base ID-token payload. Base fields
/// not explicitly overridden survive untouched.
pub struct IdTokenExtender {
    graph: Arc<PermissionGraph>,
    aggregator: Arc<ClaimsAggregator>,
    issuer: TokenIssuer,
    policy: PartialGrantPolicy,
}

impl IdTokenExtender {
    /// Wire the orchestrator together.
    #[must_use]
    pub fn new(
        graph: Arc<PermissionGraph>,
        aggregator: Arc<ClaimsAggregator>,
        issuer: TokenIssuer,
        policy: PartialGrantPolicy,
    ) -> Self {
        Self {
            graph,
            aggregator,
            issuer,
            policy,
        }
    }

    /// Produce the enriched ID-token payload.
    ///
    /// The result carries, on top of `base`:
    ///
    /// - the aggregated claims for the extended scope set,
    /// - one signed access token per resolved API, keyed by the API's
    ///   composite identifier,
    /// - `azp` — the client id,
    /// - `aud` — the client id first, then API audiences in
    ///   lexicographic order,
    /// - `api_perms` — all granted scope identifiers, sorted.
    pub fn extend(
        &self,
        base: &ClaimsMap,
        user: &User,
        client: &ClientApp,
        granted_scopes: &[String],
    ) -> Result<ClaimsMap> {
        let resolved = self.graph.resolve(client, granted_scopes, self.policy);
        debug!(
            client = %client.client_id,
            user = %user.sub,
            audiences = resolved.audiences.len(),
            "Extending ID token"
        );

        let claims = self
            .aggregator
            .aggregate(user, &resolved.extended_scopes, Some(client))?;

        let mut payload = base.clone();
        for (key, value) in claims {
            payload.insert(key, value);
        }

        for api in &resolved.audiences {
            let token = self.issuer.issue(
                user,
                &api.audience,
                &api.scope_identifiers,
                &api.included_scopes,
            )?;
            payload.insert(api.api_identifier.clone(), Value::String(token));
        }

        payload.insert(
            "azp".to_string(),
            Value::String(client.client_id.clone()),
        );

        let mut aud = Vec::with_capacity(1 + resolved.audiences.len());
        aud.push(client.client_id.clone());
        aud.extend(resolved.audience_strings());
        payload.insert("aud".to_string(), Value::from(aud));

        payload.insert("api_perms".to_string(), Value::from(resolved.api_perms()));

        Ok(payload)
    }
}
