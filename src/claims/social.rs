//! Claims sourced from linked social accounts.

use std::sync::Arc;

use tracing::debug;

use super::{ClaimContext, ClaimSource, ClaimsMap, ScopeInfo};
use crate::Result;
use crate::model::{SocialAccountStore, StandardScope};

/// Exposes one field of a linked provider account as a claim, gated on a
/// standard scope.
///
/// The stock configuration is [`github_username`](Self::github_username):
/// under the `github_username` scope, the `login` field of a linked
/// GitHub account becomes the `github_username` claim. A user without a
/// matching account (or whose account lacks the field) contributes
/// nothing; a failing account store is a real error and propagates.
pub struct SocialAccountClaims {
    store: Arc<dyn SocialAccountStore>,
    provider: String,
    extra_key: String,
    claim: String,
    scope: StandardScope,
    scope_name: &'static str,
    scope_description: &'static str,
}

impl SocialAccountClaims {
    /// GitHub username claim from a linked GitHub account.
    #[must_use]
    pub fn github_username(store: Arc<dyn SocialAccountStore>) -> Self {
        Self {
            store,
            provider: "github".to_string(),
            extra_key: "login".to_string(),
            claim: "github_username".to_string(),
            scope: StandardScope::GithubUsername,
            scope_name: "GitHub username",
            scope_description: "Access to your GitHub username.",
        }
    }
}

impl ClaimSource for SocialAccountClaims {
    fn name(&self) -> &'static str {
        "social_account"
    }

    fn scopes_info(&self, scopes: &[String], _language: &str) -> Vec<ScopeInfo> {
        scopes
            .iter()
            .filter(|s| s.as_str() == self.scope.as_str())
            .map(|scope| ScopeInfo {
                scope: scope.clone(),
                name: self.scope_name.to_string(),
                description: self.scope_description.to_string(),
            })
            .collect()
    }

    fn build(&self, ctx: &ClaimContext<'_>) -> Result<ClaimsMap> {
        let mut claims = ClaimsMap::new();
        if !ctx.has_scope(self.scope) {
            return Ok(claims);
        }

        // Store faults propagate; a missing link does not.
        let accounts = self.store.accounts_for(ctx.user)?;
        let Some(account) = accounts.iter().find(|a| a.provider == self.provider) else {
            debug!(
                user = %ctx.user.sub,
                provider = %self.provider,
                "No linked account, skipping claim"
            );
            return Ok(claims);
        };

        if let Some(value) = account.extra.get(&self.extra_key) {
            claims.insert(self.claim.clone(), value.clone());
        }
        Ok(claims)
    }
}
