//! Share management: public share tokens and direct grants.
//!
//! Public tokens let an unauthenticated party download one file under
//! time- and password-gated conditions. A token is issued only for an
//! unlocked file the requester owns, carries at least 122 bits of entropy,
//! and stores at most an argon2 hash of its password, never the
//! plaintext. Direct grants give one named principal standing read access.

use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};
use serde::Serialize;
use time::OffsetDateTime;
use url::Url;
use uuid::Uuid;

use common::prelude::{evaluate, Action, Decision, Principal};

use crate::audit::{AuditAction, AuditRecorder};
use crate::database::models::{DirectShare, FileRecord, PublicShare};
use crate::database::types::DTimestamp;
use crate::database::Database;
use crate::files::ContentHandle;

/// Issued-token descriptor returned to the owner. Never carries the hash.
#[derive(Debug, Clone, Serialize)]
pub struct ShareDescriptor {
    pub id: Uuid,
    pub token: String,
    pub share_url: String,
    pub expires_at: OffsetDateTime,
    pub has_password: bool,
}

/// What an unauthenticated visitor may learn from a live link before
/// redeeming it.
#[derive(Debug, Clone, Serialize)]
pub struct ShareView {
    pub file_id: Uuid,
    pub filename: String,
    pub size_bytes: i64,
    pub uploaded_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
    pub password_required: bool,
}

/// Owner-facing token summary; excludes the password hash.
#[derive(Debug, Clone, Serialize)]
pub struct ShareSummary {
    pub id: Uuid,
    pub token: String,
    pub share_url: String,
    pub expires_at: OffsetDateTime,
    pub download_count: i64,
    pub has_password: bool,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, thiserror::Error)]
pub enum IssueError {
    #[error("file not found")]
    NotFound,

    #[error("caller is not permitted to share this file")]
    Deny,

    #[error("locked files cannot be shared")]
    Locked,

    #[error("invalid request: {0}")]
    InvalidRequest(&'static str),

    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("secure randomness unavailable: {0}")]
    Entropy(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("share token not found")]
    TokenNotFound,

    #[error("share token has expired")]
    TokenExpired,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RedeemError {
    #[error("share token not found")]
    TokenNotFound,

    #[error("share token has expired")]
    TokenExpired,

    #[error("wrong password")]
    WrongPassword,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum RevokeError {
    #[error("share not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DirectShareError {
    #[error("file not found")]
    NotFound,

    #[error("only the owner manages direct shares")]
    Deny,

    #[error("locked files cannot be shared")]
    Locked,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct Shares {
    database: Database,
    audit: AuditRecorder,
    public_url: Url,
}

impl Shares {
    pub fn new(database: Database, audit: AuditRecorder, public_url: Url) -> Self {
        Self {
            database,
            audit,
            public_url,
        }
    }

    fn share_url(&self, token: &str) -> String {
        format!(
            "{}/share/{}",
            self.public_url.as_str().trim_end_matches('/'),
            token
        )
    }

    /// Issue a new public token for a file the caller owns.
    pub async fn issue(
        &self,
        principal: &Principal,
        file_id: Uuid,
        expires_in_hours: f64,
        password: Option<&str>,
    ) -> Result<ShareDescriptor, IssueError> {
        if !(expires_in_hours.is_finite() && expires_in_hours > 0.0) {
            return Err(IssueError::InvalidRequest(
                "expiry must be a positive number of hours",
            ));
        }

        let Some(access) = FileRecord::access_for(&self.database, file_id, principal).await? else {
            return Err(IssueError::NotFound);
        };
        match evaluate(principal, Action::CreatePublicShare, Some(&access.view())) {
            Decision::Allow => {}
            Decision::NotFound => return Err(IssueError::NotFound),
            _ => return Err(IssueError::Deny),
        }
        if access.locked {
            return Err(IssueError::Locked);
        }

        let expires_at = OffsetDateTime::now_utc()
            + time::Duration::seconds_f64(expires_in_hours * 3600.0);

        let password_hash = match password.map(str::trim).filter(|p| !p.is_empty()) {
            Some(plain) => Some(hash_password(plain).map_err(IssueError::Hash)?),
            None => None,
        };

        let token = generate_token().map_err(IssueError::Entropy)?;
        let share = PublicShare::create(
            &self.database,
            file_id,
            &principal.subject_id,
            &token,
            password_hash.as_deref(),
            expires_at.into(),
        )
        .await?;

        self.audit
            .record(principal, AuditAction::Share, Some(file_id), Some(&access.filename))
            .await;

        Ok(ShareDescriptor {
            id: share.id,
            share_url: self.share_url(&share.share_token),
            token: share.share_token,
            expires_at: share.expires_at.into(),
            has_password: share.password_hash.is_some(),
        })
    }

    /// Resolve a token for the anonymous landing view. An unknown token and
    /// an expired one render as two fixed shapes; nothing else leaks.
    pub async fn resolve(&self, token: &str) -> Result<ShareView, ResolveError> {
        let Some(share) = PublicShare::get_by_token(&self.database, token).await? else {
            return Err(ResolveError::TokenNotFound);
        };
        if share.expires_at.is_past() {
            return Err(ResolveError::TokenExpired);
        }

        Ok(ShareView {
            file_id: share.file_id,
            filename: share.filename,
            size_bytes: share.size_bytes,
            uploaded_at: share.uploaded_at.into(),
            expires_at: share.expires_at.into(),
            password_required: share.password_hash.is_some(),
        })
    }

    /// Redeem a token for its content handle, counting the download.
    pub async fn redeem(
        &self,
        token: &str,
        supplied_password: Option<&str>,
    ) -> Result<ContentHandle, RedeemError> {
        let Some(share) = PublicShare::get_by_token(&self.database, token).await? else {
            return Err(RedeemError::TokenNotFound);
        };
        // Expiry wins over everything; a correct password never revives a
        // dead link.
        if share.expires_at.is_past() {
            return Err(RedeemError::TokenExpired);
        }

        if let Some(hash) = &share.password_hash {
            let supplied = supplied_password.unwrap_or("");
            if !verify_password(hash, supplied) {
                return Err(RedeemError::WrongPassword);
            }
        }

        // The increment re-asserts expiry at write time, so a token dying
        // between the password check and here refuses without moving the
        // counter.
        let counted =
            PublicShare::record_download(&self.database, share.id, DTimestamp::now()).await?;
        if !counted {
            return Err(RedeemError::TokenExpired);
        }

        Ok(ContentHandle {
            file_id: share.file_id,
            filename: share.filename,
            size_bytes: share.size_bytes,
        })
    }

    /// List the caller's tokens on one file. The query itself is
    /// owner-scoped, so someone else's file simply lists empty.
    pub async fn list_for_file(
        &self,
        principal: &Principal,
        file_id: Uuid,
    ) -> Result<Vec<ShareSummary>, sqlx::Error> {
        let rows =
            PublicShare::list_for_file(&self.database, file_id, &principal.subject_id).await?;
        Ok(rows
            .into_iter()
            .map(|share| {
                let share_url = self.share_url(&share.share_token);
                ShareSummary {
                    id: share.id,
                    token: share.share_token,
                    share_url,
                    expires_at: share.expires_at.into(),
                    download_count: share.download_count,
                    has_password: share.password_hash.is_some(),
                    created_at: share.created_at.into(),
                }
            })
            .collect())
    }

    /// Revoke one token the caller owns. Deleting zero rows reports
    /// `NotFound`, never a silent no-op.
    pub async fn revoke(&self, principal: &Principal, share_id: Uuid) -> Result<(), RevokeError> {
        let deleted = PublicShare::delete(&self.database, share_id, &principal.subject_id).await?;
        if !deleted {
            return Err(RevokeError::NotFound);
        }
        self.audit
            .record(principal, AuditAction::RevokeShare, None, None)
            .await;
        Ok(())
    }

    /// Grant a named principal standing read access to an owned, unlocked
    /// file. Granting twice is a no-op.
    pub async fn grant_direct(
        &self,
        principal: &Principal,
        file_id: Uuid,
        target_user_id: &str,
    ) -> Result<(), DirectShareError> {
        let access = self.owned_access(principal, file_id).await?;
        if access.locked {
            return Err(DirectShareError::Locked);
        }
        DirectShare::create(&self.database, file_id, target_user_id).await?;
        Ok(())
    }

    /// List the direct grants on an owned file.
    pub async fn list_direct(
        &self,
        principal: &Principal,
        file_id: Uuid,
    ) -> Result<Vec<DirectShare>, DirectShareError> {
        self.owned_access(principal, file_id).await?;
        Ok(DirectShare::list_for_file(&self.database, file_id).await?)
    }

    /// Remove one direct grant from an owned file.
    pub async fn revoke_direct(
        &self,
        principal: &Principal,
        file_id: Uuid,
        target_user_id: &str,
    ) -> Result<(), DirectShareError> {
        self.owned_access(principal, file_id).await?;
        let deleted = DirectShare::delete(&self.database, file_id, target_user_id).await?;
        if !deleted {
            return Err(DirectShareError::NotFound);
        }
        Ok(())
    }

    async fn owned_access(
        &self,
        principal: &Principal,
        file_id: Uuid,
    ) -> Result<crate::database::models::FileAccess, DirectShareError> {
        let Some(access) = FileRecord::access_for(&self.database, file_id, principal).await? else {
            return Err(DirectShareError::NotFound);
        };
        if !principal.owns(&access.owner_id) {
            return Err(DirectShareError::Deny);
        }
        Ok(access)
    }
}

/// Argon2 PHC string from a plaintext, with a fresh random salt.
pub(crate) fn hash_password(password: &str) -> Result<String, String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| e.to_string())?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| e.to_string())?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| e.to_string())
}

/// Constant-time verification against a stored PHC string. An unparsable
/// hash counts as a failed match rather than an error.
pub(crate) fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// 128 bits from the OS CSPRNG, hex-encoded. Uniqueness is additionally
/// enforced by the database constraint on the token column.
pub(crate) fn generate_token() -> Result<String, String> {
    let mut bytes = [0u8; 16];
    getrandom::getrandom(&mut bytes).map_err(|e| e.to_string())?;
    Ok(hex::encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("abc").unwrap();
        assert_ne!(hash, "abc");
        assert!(verify_password(&hash, "abc"));
        assert!(!verify_password(&hash, "abd"));
        assert!(!verify_password(&hash, ""));
    }

    #[test]
    fn garbage_hash_never_verifies() {
        assert!(!verify_password("not-a-phc-string", "abc"));
    }

    #[test]
    fn tokens_are_long_and_distinct() {
        let a = generate_token().unwrap();
        let b = generate_token().unwrap();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
