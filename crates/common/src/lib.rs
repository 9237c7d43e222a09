/**
 * Permission evaluation over principals, actions and
 *  resource snapshots. Pure and synchronous; safe to
 *  call from any number of concurrent requests.
 */
pub mod access;
/**
 * Translation of a verified identity assertion into
 *  a canonical principal. The cryptographic side of
 *  token verification lives with the identity-provider
 *  collaborator, never here.
 */
pub mod claims;
/**
 * The principal model and the role vocabulary shared
 *  across the workspace.
 */
pub mod principal;

pub mod prelude {
    pub use crate::access::{evaluate, Action, Decision, ResourceView};
    pub use crate::claims::{resolve_principal, ClaimSet, InvalidPrincipal, RoleClaim};
    pub use crate::principal::{
        Principal, ROLE_PLATFORM_SUPER, ROLE_USER, ROLE_WORKSPACE_ADMIN,
    };
}
