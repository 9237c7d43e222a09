//! # Principals
//!
//! A principal is the caller identity for exactly one request, derived from
//! the claims of a verified bearer token. It is never persisted and carries
//! its own step-up evidence; there is no server-side step-up session to
//! consult or expire.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Platform-wide super role. Sees everything, exempt from step-up.
pub const ROLE_PLATFORM_SUPER: &str = "platform_super";

/// Workspace administrator role.
pub const ROLE_WORKSPACE_ADMIN: &str = "workspace_admin";

/// Baseline role held by ordinary members.
pub const ROLE_USER: &str = "user";

/// A caller identity derived from a verified claim set.
///
/// `roles` is the union of the platform-realm and service-scoped role
/// claims. Roles the evaluator does not recognize simply never match a
/// rule; they are carried, not rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable subject identifier from the identity provider.
    pub subject_id: String,
    /// Display name, used for audit entries and file attribution.
    pub username: String,
    pub roles: HashSet<String>,
    /// Whether this request presented one-time-password evidence.
    pub step_up_satisfied: bool,
}

impl Principal {
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    pub fn is_super(&self) -> bool {
        self.has_role(ROLE_PLATFORM_SUPER)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(ROLE_WORKSPACE_ADMIN)
    }

    pub fn is_plain_user(&self) -> bool {
        self.has_role(ROLE_USER)
    }

    pub fn owns(&self, owner_id: &str) -> bool {
        self.subject_id == owner_id
    }
}
