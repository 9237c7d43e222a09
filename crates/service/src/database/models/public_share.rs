use sqlx::FromRow;
use uuid::Uuid;

use crate::database::types::DTimestamp;
use crate::database::Database;

/// A bearer-less share token row. `share_token` is unguessable and unique
/// across all rows; `password_hash` is a PHC string, never the plaintext.
#[derive(Debug, Clone, FromRow)]
pub struct PublicShare {
    pub id: Uuid,
    pub file_id: Uuid,
    pub owner_id: String,
    pub share_token: String,
    pub password_hash: Option<String>,
    pub expires_at: DTimestamp,
    pub download_count: i64,
    pub created_at: DTimestamp,
}

/// Token row joined with the file it discloses, for the anonymous
/// resolve/redeem path.
#[derive(Debug, Clone, FromRow)]
pub struct PublicShareWithFile {
    pub id: Uuid,
    pub file_id: Uuid,
    pub password_hash: Option<String>,
    pub expires_at: DTimestamp,
    pub download_count: i64,
    pub filename: String,
    pub size_bytes: i64,
    pub uploaded_at: DTimestamp,
}

impl PublicShare {
    /// Insert a new token row
    pub async fn create(
        db: &Database,
        file_id: Uuid,
        owner_id: &str,
        share_token: &str,
        password_hash: Option<&str>,
        expires_at: DTimestamp,
    ) -> Result<PublicShare, sqlx::Error> {
        let id = Uuid::new_v4();
        let created_at = DTimestamp::now();

        sqlx::query(
            r#"
            INSERT INTO public_shares (
                id, file_id, owner_id, share_token, password_hash,
                expires_at, download_count, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0, ?7)
            "#,
        )
        .bind(id)
        .bind(file_id)
        .bind(owner_id)
        .bind(share_token)
        .bind(password_hash)
        .bind(expires_at)
        .bind(created_at)
        .execute(&**db)
        .await?;

        Self::get(db, id).await?.ok_or(sqlx::Error::RowNotFound)
    }

    /// Get a token row by ID
    pub async fn get(db: &Database, id: Uuid) -> Result<Option<PublicShare>, sqlx::Error> {
        sqlx::query_as::<_, PublicShare>(
            r#"
            SELECT id, file_id, owner_id, share_token, password_hash,
                   expires_at, download_count, created_at
            FROM public_shares
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&**db)
        .await
    }

    /// Look up a token value together with its file, for the anonymous path
    pub async fn get_by_token(
        db: &Database,
        token: &str,
    ) -> Result<Option<PublicShareWithFile>, sqlx::Error> {
        sqlx::query_as::<_, PublicShareWithFile>(
            r#"
            SELECT
                ps.id, ps.file_id, ps.password_hash, ps.expires_at, ps.download_count,
                f.filename, f.size_bytes, f.uploaded_at
            FROM public_shares ps
            INNER JOIN files f ON f.id = ps.file_id
            WHERE ps.share_token = ?1
            "#,
        )
        .bind(token)
        .fetch_optional(&**db)
        .await
    }

    /// List an owner's tokens for one file, newest first
    pub async fn list_for_file(
        db: &Database,
        file_id: Uuid,
        owner_id: &str,
    ) -> Result<Vec<PublicShare>, sqlx::Error> {
        sqlx::query_as::<_, PublicShare>(
            r#"
            SELECT id, file_id, owner_id, share_token, password_hash,
                   expires_at, download_count, created_at
            FROM public_shares
            WHERE file_id = ?1 AND owner_id = ?2
            ORDER BY created_at DESC
            "#,
        )
        .bind(file_id)
        .bind(owner_id)
        .fetch_all(&**db)
        .await
    }

    /// Owner-conditional delete of one token
    pub async fn delete(db: &Database, id: Uuid, owner_id: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            DELETE FROM public_shares
            WHERE id = ?1 AND owner_id = ?2
            "#,
        )
        .bind(id)
        .bind(owner_id)
        .execute(&**db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Count tokens on a file that have not yet expired
    pub async fn count_active(
        db: &Database,
        file_id: Uuid,
        now: DTimestamp,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM public_shares
            WHERE file_id = ?1 AND expires_at > ?2
            "#,
        )
        .bind(file_id)
        .bind(now)
        .fetch_one(&**db)
        .await
    }

    /// Single-statement download counter bump. Concurrent redemptions
    /// serialize inside the database so no increment is lost, and the
    /// WHERE clause re-asserts expiry at write time.
    pub async fn record_download(
        db: &Database,
        id: Uuid,
        now: DTimestamp,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE public_shares
            SET download_count = download_count + 1
            WHERE id = ?1 AND expires_at > ?2
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(&**db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
