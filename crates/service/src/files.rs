//! File metadata operations: registration, listings, content access and
//! deletion. Content bytes live in the external content store keyed by
//! filename; everything here hands out at most a [`ContentHandle`], and
//! only after an `Allow` decision.

use serde::Serialize;
use uuid::Uuid;

use common::prelude::{evaluate, Action, Decision, Principal, ResourceView};

use crate::audit::{AuditAction, AuditRecorder};
use crate::database::models::{FileRecord, OwnedFile, PublicShare};
use crate::database::types::DTimestamp;
use crate::database::Database;

/// Reference to content bytes in the external content store.
#[derive(Debug, Clone, Serialize)]
pub struct ContentHandle {
    pub file_id: Uuid,
    pub filename: String,
    pub size_bytes: i64,
}

#[derive(Debug, thiserror::Error)]
pub enum AccessError {
    #[error("file not found")]
    NotFound,

    #[error("caller is not permitted to perform this action")]
    Deny,

    #[error("step-up authentication required")]
    StepUpRequired,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum DeleteError {
    #[error("file not found")]
    NotFound,

    #[error("only the owner may delete a file")]
    Deny,

    #[error("file is locked")]
    Locked,

    #[error("file has active public shares, revoke them first")]
    HasActiveShares,

    #[error("step-up authentication required")]
    StepUpRequired,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Clone)]
pub struct Files {
    database: Database,
    audit: AuditRecorder,
}

impl Files {
    pub fn new(database: Database, audit: AuditRecorder) -> Self {
        Self { database, audit }
    }

    /// Record a newly stored file's metadata. The content bytes were
    /// already placed in the content store by the caller layer.
    pub async fn register(
        &self,
        principal: &Principal,
        filename: &str,
        size_bytes: i64,
    ) -> Result<FileRecord, sqlx::Error> {
        let record = FileRecord::create(&self.database, principal, filename, size_bytes).await?;
        self.audit
            .record(principal, AuditAction::Upload, Some(record.id), Some(&record.filename))
            .await;
        Ok(record)
    }

    /// Render a bare permission decision for an action against a file,
    /// without performing it.
    pub async fn check_permission(
        &self,
        principal: &Principal,
        action: Action,
        file_id: Uuid,
    ) -> Result<Decision, sqlx::Error> {
        if !action.is_resource_scoped() {
            return Ok(evaluate(principal, action, None));
        }
        let access = FileRecord::access_for(&self.database, file_id, principal).await?;
        let view = access.as_ref().map(|a| a.view());
        Ok(evaluate(principal, action, view.as_ref()))
    }

    /// The caller's own files, with direct-share counts.
    pub async fn list_own(&self, principal: &Principal) -> Result<Vec<OwnedFile>, sqlx::Error> {
        FileRecord::list_owned(&self.database, &principal.subject_id).await
    }

    /// Files other owners have directly shared to the caller.
    pub async fn list_shared_with(
        &self,
        principal: &Principal,
    ) -> Result<Vec<FileRecord>, sqlx::Error> {
        FileRecord::list_shared_with(&self.database, &principal.subject_id).await
    }

    /// Every file in the workspace; supers and (stepped-up) admins only.
    pub async fn list_all(&self, principal: &Principal) -> Result<Vec<FileRecord>, AccessError> {
        match evaluate(principal, Action::ListAllFiles, None) {
            Decision::Allow => Ok(FileRecord::list_all(&self.database).await?),
            Decision::StepUpRequired => Err(AccessError::StepUpRequired),
            Decision::Deny => Err(AccessError::Deny),
            Decision::NotFound => Err(AccessError::NotFound),
        }
    }

    /// Metadata for one file. Stays readable while locked so owners can see
    /// the lock status.
    pub async fn metadata(
        &self,
        principal: &Principal,
        file_id: Uuid,
    ) -> Result<FileRecord, AccessError> {
        let Some(access) = FileRecord::access_for(&self.database, file_id, principal).await? else {
            return Err(AccessError::NotFound);
        };
        match evaluate(principal, Action::ViewMetadata, Some(&access.view())) {
            Decision::Allow => {}
            Decision::StepUpRequired => return Err(AccessError::StepUpRequired),
            Decision::Deny => return Err(AccessError::Deny),
            Decision::NotFound => return Err(AccessError::NotFound),
        }
        FileRecord::get(&self.database, file_id)
            .await?
            .ok_or(AccessError::NotFound)
    }

    /// Content handle for an inline view.
    pub async fn view_content(
        &self,
        principal: &Principal,
        file_id: Uuid,
    ) -> Result<ContentHandle, AccessError> {
        self.content_access(principal, file_id, Action::ViewContent)
            .await
    }

    /// Content handle for a download; audited.
    pub async fn download(
        &self,
        principal: &Principal,
        file_id: Uuid,
    ) -> Result<ContentHandle, AccessError> {
        let handle = self
            .content_access(principal, file_id, Action::Download)
            .await?;
        self.audit
            .record(principal, AuditAction::Download, Some(file_id), Some(&handle.filename))
            .await;
        Ok(handle)
    }

    async fn content_access(
        &self,
        principal: &Principal,
        file_id: Uuid,
        action: Action,
    ) -> Result<ContentHandle, AccessError> {
        let Some(access) = FileRecord::access_for(&self.database, file_id, principal).await? else {
            return Err(AccessError::NotFound);
        };
        match evaluate(principal, action, Some(&access.view())) {
            Decision::Allow => {}
            Decision::StepUpRequired => return Err(AccessError::StepUpRequired),
            Decision::Deny => return Err(AccessError::Deny),
            Decision::NotFound => return Err(AccessError::NotFound),
        }
        Ok(ContentHandle {
            file_id,
            filename: access.filename,
            size_bytes: access.size_bytes,
        })
    }

    /// Remove a file's metadata row, cascading its direct shares and public
    /// share tokens. Returns the removed record so the caller layer can
    /// delete the content bytes it owns.
    ///
    /// Check order matches the deployed behavior: existence, then
    /// ownership, then the lock, then active public shares, then step-up.
    /// An active (non-expired) public share blocks deletion outright;
    /// expired tokens are simply swept by the cascade.
    pub async fn delete(
        &self,
        principal: &Principal,
        file_id: Uuid,
    ) -> Result<FileRecord, DeleteError> {
        let Some(record) = FileRecord::get(&self.database, file_id).await? else {
            return Err(DeleteError::NotFound);
        };

        let view = ResourceView {
            owner_id: record.owner_id.clone(),
            locked: record.locked,
            shared_with_caller: false,
        };
        let decision = evaluate(principal, Action::Delete, Some(&view));
        match decision {
            Decision::Deny => return Err(DeleteError::Deny),
            Decision::NotFound => return Err(DeleteError::NotFound),
            Decision::Allow | Decision::StepUpRequired => {}
        }

        if record.locked {
            return Err(DeleteError::Locked);
        }
        let active = PublicShare::count_active(&self.database, file_id, DTimestamp::now()).await?;
        if active > 0 {
            return Err(DeleteError::HasActiveShares);
        }
        if decision == Decision::StepUpRequired {
            return Err(DeleteError::StepUpRequired);
        }

        let deleted =
            FileRecord::delete_cascade(&self.database, file_id, &principal.subject_id).await?;
        if !deleted {
            // vanished (or flipped to locked) between the checks and the
            // conditional delete
            return Err(DeleteError::NotFound);
        }

        self.audit
            .record(principal, AuditAction::Delete, Some(file_id), Some(&record.filename))
            .await;

        Ok(record)
    }
}
