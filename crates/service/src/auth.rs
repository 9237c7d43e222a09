//! The authentication boundary.
//!
//! Signature and issuer verification belong to the identity-provider
//! collaborator behind [`IdentityVerifier`]; this module only bounds the
//! call and turns the verified claims into a [`Principal`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use common::claims::InvalidPrincipal;
use common::prelude::{resolve_principal, ClaimSet, Principal};

/// External identity-provider collaborator. Implementations own token
/// signature, issuer, and key-rotation concerns; the core consumes only
/// the resulting claim set.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, bearer_token: &str) -> Result<ClaimSet, VerifierError>;
}

#[derive(Debug, thiserror::Error)]
pub enum VerifierError {
    #[error("token rejected: {0}")]
    Rejected(String),

    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error(transparent)]
    Verifier(#[from] VerifierError),

    #[error("identity verification timed out")]
    Timeout,

    #[error(transparent)]
    InvalidPrincipal(#[from] InvalidPrincipal),
}

/// Resolves bearer tokens into per-request principals via the injected
/// verifier.
#[derive(Clone)]
pub struct Authenticator {
    verifier: Arc<dyn IdentityVerifier>,
    timeout: Duration,
    service_client: String,
}

impl Authenticator {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        timeout: Duration,
        service_client: impl Into<String>,
    ) -> Self {
        Self {
            verifier,
            timeout,
            service_client: service_client.into(),
        }
    }

    /// Verify the token within the configured bound and fail closed on an
    /// unusable subject claim.
    pub async fn authenticate(&self, bearer_token: &str) -> Result<Principal, AuthError> {
        let claims = tokio::time::timeout(self.timeout, self.verifier.verify(bearer_token))
            .await
            .map_err(|_| AuthError::Timeout)??;
        Ok(resolve_principal(&claims, &self.service_client)?)
    }
}
