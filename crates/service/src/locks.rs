//! The file lock state machine: `Unlocked <-> Locked`.
//!
//! Transitions are idempotent at the storage layer (locking a locked file
//! is a no-op success), but authorization and step-up checks run on every
//! attempt. While locked, download, content view, delete and new sharing
//! are all refused elsewhere in the core; only metadata stays readable.

use uuid::Uuid;

use common::prelude::{evaluate, Action, Decision, Principal};

use crate::audit::{AuditAction, AuditRecorder};
use crate::database::models::FileRecord;
use crate::database::Database;

#[derive(Clone)]
pub struct Locks {
    database: Database,
    audit: AuditRecorder,
}

#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("file not found")]
    NotFound,

    #[error("caller is not permitted to change the lock state")]
    Deny,

    #[error("step-up authentication required")]
    StepUpRequired,

    #[error("lock state was not updated")]
    Conflict,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl Locks {
    pub fn new(database: Database, audit: AuditRecorder) -> Self {
        Self { database, audit }
    }

    /// Drive the lock flag to `desired`.
    pub async fn set_lock(
        &self,
        principal: &Principal,
        file_id: Uuid,
        desired: bool,
    ) -> Result<(), LockError> {
        let Some(access) = FileRecord::access_for(&self.database, file_id, principal).await? else {
            return Err(LockError::NotFound);
        };

        let action = if desired { Action::Lock } else { Action::Unlock };
        match evaluate(principal, action, Some(&access.view())) {
            Decision::Allow => {}
            Decision::Deny => return Err(LockError::Deny),
            Decision::StepUpRequired => return Err(LockError::StepUpRequired),
            Decision::NotFound => return Err(LockError::NotFound),
        }

        let elevated = principal.is_admin() || principal.is_super();
        let updated =
            FileRecord::set_locked(&self.database, file_id, &principal.subject_id, elevated, desired)
                .await?;
        if !updated {
            // The row vanished or changed hands between the permission
            // check and the write. Distinct from an authorization failure;
            // the caller may safely retry once.
            return Err(LockError::Conflict);
        }

        let audit_action = if desired {
            AuditAction::Lock
        } else {
            AuditAction::Unlock
        };
        self.audit
            .record(principal, audit_action, Some(file_id), Some(&access.filename))
            .await;

        Ok(())
    }
}
