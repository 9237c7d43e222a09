//! Append-only audit recording.
//!
//! Audit is best-effort observability, not a transactional guarantee: a
//! failed write is logged through `tracing` and swallowed so it can never
//! fail, roll back, or delay the operation it accompanies.

use uuid::Uuid;

use common::prelude::Principal;

use crate::database::models::AuditLogEntry;
use crate::database::Database;

/// Actions recorded in the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    Upload,
    Download,
    Delete,
    Lock,
    Unlock,
    Share,
    RevokeShare,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::Upload => "upload",
            AuditAction::Download => "download",
            AuditAction::Delete => "delete",
            AuditAction::Lock => "lock",
            AuditAction::Unlock => "unlock",
            AuditAction::Share => "share",
            AuditAction::RevokeShare => "revoke_share",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone)]
pub struct AuditRecorder {
    database: Database,
}

impl AuditRecorder {
    pub fn new(database: Database) -> Self {
        Self { database }
    }

    /// Append one entry, swallowing any write failure.
    pub async fn record(
        &self,
        principal: &Principal,
        action: AuditAction,
        file_id: Option<Uuid>,
        filename: Option<&str>,
    ) {
        if let Err(err) = AuditLogEntry::insert(
            &self.database,
            &principal.subject_id,
            Some(&principal.username),
            action.as_str(),
            file_id,
            filename,
        )
        .await
        {
            tracing::warn!(action = action.as_str(), %err, "audit write failed");
        }
    }

    /// Recent entries, newest first. Workspace admins and platform supers
    /// only.
    pub async fn list_recent(
        &self,
        principal: &Principal,
        limit: Option<i64>,
    ) -> Result<Vec<AuditLogEntry>, AuditQueryError> {
        if !(principal.is_admin() || principal.is_super()) {
            return Err(AuditQueryError::Deny);
        }
        let limit = limit.unwrap_or(500).clamp(1, 500);
        Ok(AuditLogEntry::list_recent(&self.database, limit).await?)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuditQueryError {
    #[error("caller is not permitted to read the audit log")]
    Deny,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}
