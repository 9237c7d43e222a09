use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use common::prelude::{Principal, ResourceView};

use crate::database::types::DTimestamp;
use crate::database::Database;

/// A stored file's metadata row. The content bytes live in the external
/// content store, keyed by `filename`.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    /// Subject id of the owning principal.
    pub owner_id: String,
    /// Display name of the uploader at upload time.
    pub uploader: String,
    pub filename: String,
    pub size_bytes: i64,
    pub locked: bool,
    pub uploaded_at: DTimestamp,
}

/// Owner-facing listing row: the file plus how many principals it is
/// directly shared with.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct OwnedFile {
    pub id: Uuid,
    pub owner_id: String,
    pub uploader: String,
    pub filename: String,
    pub size_bytes: i64,
    pub locked: bool,
    pub uploaded_at: DTimestamp,
    pub shared_count: i64,
}

/// The slice of file state the permission evaluator needs, resolved for
/// one specific caller in a single query.
#[derive(Debug, Clone, FromRow)]
pub struct FileAccess {
    pub owner_id: String,
    pub filename: String,
    pub size_bytes: i64,
    pub locked: bool,
    pub shared_with_caller: bool,
}

impl FileAccess {
    pub fn view(&self) -> ResourceView {
        ResourceView {
            owner_id: self.owner_id.clone(),
            locked: self.locked,
            shared_with_caller: self.shared_with_caller,
        }
    }
}

impl FileRecord {
    /// Register a new file's metadata
    pub async fn create(
        db: &Database,
        owner: &Principal,
        filename: &str,
        size_bytes: i64,
    ) -> Result<FileRecord, sqlx::Error> {
        let id = Uuid::new_v4();
        let uploaded_at = DTimestamp::now();

        sqlx::query(
            r#"
            INSERT INTO files (id, owner_id, uploader, filename, size_bytes, locked, uploaded_at)
            VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            "#,
        )
        .bind(id)
        .bind(&owner.subject_id)
        .bind(&owner.username)
        .bind(filename)
        .bind(size_bytes)
        .bind(uploaded_at)
        .execute(&**db)
        .await?;

        Self::get(db, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Get a file by ID
    pub async fn get(db: &Database, id: Uuid) -> Result<Option<FileRecord>, sqlx::Error> {
        sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, owner_id, uploader, filename, size_bytes, locked, uploaded_at
            FROM files
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&**db)
        .await
    }

    /// Resolve the caller-specific access view in one query.
    pub async fn access_for(
        db: &Database,
        id: Uuid,
        caller: &Principal,
    ) -> Result<Option<FileAccess>, sqlx::Error> {
        sqlx::query_as::<_, FileAccess>(
            r#"
            SELECT
                f.owner_id,
                f.filename,
                f.size_bytes,
                f.locked,
                (s.id IS NOT NULL) AS shared_with_caller
            FROM files f
            LEFT JOIN shares s ON s.file_id = f.id AND s.target_user_id = ?1
            WHERE f.id = ?2
            "#,
        )
        .bind(&caller.subject_id)
        .bind(id)
        .fetch_optional(&**db)
        .await
    }

    /// List a principal's own files, newest first, with direct-share counts
    pub async fn list_owned(db: &Database, owner_id: &str) -> Result<Vec<OwnedFile>, sqlx::Error> {
        sqlx::query_as::<_, OwnedFile>(
            r#"
            SELECT
                f.id, f.owner_id, f.uploader, f.filename, f.size_bytes, f.locked, f.uploaded_at,
                COALESCE(s.cnt, 0) AS shared_count
            FROM files f
            LEFT JOIN (
                SELECT file_id, COUNT(*) AS cnt
                FROM shares
                GROUP BY file_id
            ) s ON s.file_id = f.id
            WHERE f.owner_id = ?1
            ORDER BY f.uploaded_at DESC
            "#,
        )
        .bind(owner_id)
        .fetch_all(&**db)
        .await
    }

    /// List the files directly shared to a principal, newest first
    pub async fn list_shared_with(
        db: &Database,
        user_id: &str,
    ) -> Result<Vec<FileRecord>, sqlx::Error> {
        sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT f.id, f.owner_id, f.uploader, f.filename, f.size_bytes, f.locked, f.uploaded_at
            FROM files f
            INNER JOIN shares s ON s.file_id = f.id
            WHERE s.target_user_id = ?1
            ORDER BY f.uploaded_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&**db)
        .await
    }

    /// List every file, newest first
    pub async fn list_all(db: &Database) -> Result<Vec<FileRecord>, sqlx::Error> {
        sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, owner_id, uploader, filename, size_bytes, locked, uploaded_at
            FROM files
            ORDER BY uploaded_at DESC
            "#,
        )
        .fetch_all(&**db)
        .await
    }

    /// Conditional lock flip. The WHERE clause re-asserts ownership (or an
    /// elevated caller) so a row that vanished or changed hands between the
    /// permission check and this write reports zero rows instead of racing.
    pub async fn set_locked(
        db: &Database,
        id: Uuid,
        caller_id: &str,
        elevated: bool,
        locked: bool,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE files
            SET locked = ?1
            WHERE id = ?2 AND (owner_id = ?3 OR ?4)
            "#,
        )
        .bind(locked)
        .bind(id)
        .bind(caller_id)
        .bind(elevated)
        .execute(&**db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Owner-conditional delete that cascades over direct shares and public
    /// share tokens in a single transaction. Returns false when the file
    /// row was not deleted (vanished, changed hands, or became locked in
    /// the meantime); in that case nothing else is touched.
    pub async fn delete_cascade(
        db: &Database,
        id: Uuid,
        owner_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let mut tx = db.begin().await?;

        let result = sqlx::query(
            r#"
            DELETE FROM files
            WHERE id = ?1 AND owner_id = ?2 AND locked = 0
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        sqlx::query("DELETE FROM shares WHERE file_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM public_shares WHERE file_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }
}
