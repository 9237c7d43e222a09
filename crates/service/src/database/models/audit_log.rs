use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::types::DTimestamp;
use crate::database::Database;

/// One append-only audit trail entry. Rows are never updated or deleted by
/// this core.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditLogEntry {
    pub id: i64,
    pub user_id: String,
    pub username: Option<String>,
    pub action: String,
    pub file_id: Option<Uuid>,
    pub filename: Option<String>,
    pub created_at: DTimestamp,
}

impl AuditLogEntry {
    /// Append one entry
    pub async fn insert(
        db: &Database,
        user_id: &str,
        username: Option<&str>,
        action: &str,
        file_id: Option<Uuid>,
        filename: Option<&str>,
    ) -> Result<(), sqlx::Error> {
        let created_at = DTimestamp::now();

        sqlx::query(
            r#"
            INSERT INTO audit_logs (user_id, username, action, file_id, filename, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(user_id)
        .bind(username)
        .bind(action)
        .bind(file_id)
        .bind(filename)
        .bind(created_at)
        .execute(&**db)
        .await?;

        Ok(())
    }

    /// Most recent entries first
    pub async fn list_recent(db: &Database, limit: i64) -> Result<Vec<AuditLogEntry>, sqlx::Error> {
        sqlx::query_as::<_, AuditLogEntry>(
            r#"
            SELECT id, user_id, username, action, file_id, filename, created_at
            FROM audit_logs
            ORDER BY created_at DESC, id DESC
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&**db)
        .await
    }
}
