//! Standard OIDC claims built from the user record.

use serde_json::Value;

use super::{ClaimContext, ClaimSource, ClaimsMap, ScopeInfo};
use crate::Result;
use crate::model::StandardScope;

/// The OIDC core claim source: email, profile and address scopes served
/// directly from [`User`](crate::model::User) fields.
///
/// The user record carries no postal address, so the address scope
/// contributes nothing — an empty contribution, not an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardClaims;

impl StandardClaims {
    /// Create the standard claim source.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl ClaimSource for StandardClaims {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn scopes_info(&self, scopes: &[String], _language: &str) -> Vec<ScopeInfo> {
        scopes
            .iter()
            .filter_map(|scope| {
                let (name, description) = match StandardScope::parse(scope)? {
                    StandardScope::Email => ("E-mail", "Access to your e-mail address."),
                    StandardScope::Profile => {
                        ("Profile", "Access to your basic profile information.")
                    }
                    StandardScope::Address => ("Address", "Access to your postal address."),
                    // Served by the social account source.
                    StandardScope::GithubUsername => return None,
                };
                Some(ScopeInfo {
                    scope: scope.clone(),
                    name: name.to_string(),
                    description: description.to_string(),
                })
            })
            .collect()
    }

    fn build(&self, ctx: &ClaimContext<'_>) -> Result<ClaimsMap> {
        let mut claims = ClaimsMap::new();

        if ctx.has_scope(StandardScope::Email) {
            claims.insert("email".to_string(), Value::String(ctx.user.email.clone()));
        }

        if ctx.has_scope(StandardScope::Profile) {
            claims.insert(
                "preferred_username".to_string(),
                Value::String(ctx.user.username.clone()),
            );
            if let Some(name) = ctx.user.full_name() {
                claims.insert("name".to_string(), Value::String(name));
            }
            if let Some(given) = &ctx.user.given_name {
                claims.insert("given_name".to_string(), Value::String(given.clone()));
            }
            if let Some(family) = &ctx.user.family_name {
                claims.insert("family_name".to_string(), Value::String(family.clone()));
            }
        }

        Ok(claims)
    }
}
