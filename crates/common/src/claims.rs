//! ClaimSet resolution.
//!
//! The identity-provider collaborator verifies the bearer token's signature
//! and issuer and hands over the decoded payload. This module turns that
//! payload into a [`Principal`], failing closed when the subject claim is
//! unusable rather than substituting an anonymous identity.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::principal::Principal;

/// Entry in the authentication-methods-reference claim that counts as
/// one-time-password evidence.
pub const OTP_METHOD: &str = "otp";

/// One role-list claim namespace (`{"roles": [...]}`).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoleClaim {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// The verified token payload as delivered by the identity provider.
///
/// Only the claims the core consumes are modeled; everything else in the
/// token is ignored during deserialization. Every field is optional so a
/// sparse token still resolves; the one hard requirement is a usable
/// subject.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClaimSet {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub preferred_username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Platform-realm role list.
    #[serde(default)]
    pub realm_access: Option<RoleClaim>,
    /// Service-scoped role lists, keyed by client id.
    #[serde(default)]
    pub resource_access: HashMap<String, RoleClaim>,
    /// Authentication-methods-reference claim.
    #[serde(default)]
    pub amr: Vec<String>,
    /// Authentication-context class claim.
    #[serde(default)]
    pub acr: Option<String>,
    /// Authenticator-assurance-level claim; some providers send this
    /// instead of `acr`.
    #[serde(default)]
    pub aal: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidPrincipal {
    #[error("subject claim is missing or empty")]
    MissingSubject,
}

/// Build the canonical principal for one request.
///
/// Roles are the union of the realm list and the `service_client`-scoped
/// list; duplicates collapse and unrecognized roles pass through untouched.
pub fn resolve_principal(
    claims: &ClaimSet,
    service_client: &str,
) -> Result<Principal, InvalidPrincipal> {
    let subject_id = claims
        .sub
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(InvalidPrincipal::MissingSubject)?
        .to_string();

    let mut roles: HashSet<String> = HashSet::new();
    if let Some(realm) = &claims.realm_access {
        roles.extend(realm.roles.iter().cloned());
    }
    if let Some(client) = claims.resource_access.get(service_client) {
        roles.extend(client.roles.iter().cloned());
    }

    let username = claims
        .preferred_username
        .clone()
        .or_else(|| claims.email.clone())
        .unwrap_or_else(|| subject_id.clone());

    Ok(Principal {
        subject_id,
        username,
        roles,
        step_up_satisfied: step_up_satisfied(claims),
    })
}

/// Step-up evidence: an `otp` entry in `amr`, or a high-assurance
/// authentication context (`aal2`/`mfa`) in `acr`, falling back to `aal`
/// when `acr` is absent or empty. Missing claims mean unsatisfied, never
/// an error.
pub fn step_up_satisfied(claims: &ClaimSet) -> bool {
    if claims.amr.iter().any(|method| method == OTP_METHOD) {
        return true;
    }
    let context = claims
        .acr
        .as_deref()
        .filter(|value| !value.is_empty())
        .or(claims.aal.as_deref())
        .unwrap_or("")
        .to_ascii_lowercase();
    context.contains("aal2") || context.contains("mfa")
}
