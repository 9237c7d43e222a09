use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::types::DTimestamp;
use crate::database::Database;

/// A standing read grant from a file's owner to one named principal.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct DirectShare {
    pub id: Uuid,
    pub file_id: Uuid,
    pub target_user_id: String,
    pub created_at: DTimestamp,
}

impl DirectShare {
    /// Grant access; granting the same (file, principal) pair twice is a
    /// no-op thanks to the unique constraint.
    pub async fn create(
        db: &Database,
        file_id: Uuid,
        target_user_id: &str,
    ) -> Result<(), sqlx::Error> {
        let id = Uuid::new_v4();
        let created_at = DTimestamp::now();

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO shares (id, file_id, target_user_id, created_at)
            VALUES (?1, ?2, ?3, ?4)
            "#,
        )
        .bind(id)
        .bind(file_id)
        .bind(target_user_id)
        .bind(created_at)
        .execute(&**db)
        .await?;

        Ok(())
    }

    /// List grants on a file, newest first
    pub async fn list_for_file(
        db: &Database,
        file_id: Uuid,
    ) -> Result<Vec<DirectShare>, sqlx::Error> {
        sqlx::query_as::<_, DirectShare>(
            r#"
            SELECT id, file_id, target_user_id, created_at
            FROM shares
            WHERE file_id = ?1
            ORDER BY created_at DESC
            "#,
        )
        .bind(file_id)
        .fetch_all(&**db)
        .await
    }

    /// Remove one grant
    pub async fn delete(
        db: &Database,
        file_id: Uuid,
        target_user_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM shares
            WHERE file_id = ?1 AND target_user_id = ?2
            "#,
        )
        .bind(file_id)
        .bind(target_user_id)
        .execute(&**db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
