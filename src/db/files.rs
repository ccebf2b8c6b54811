//! Database operations for the file metadata index.
//!
//! The index is the authority on which files exist: a file is "present"
//! exactly while its record is, regardless of the state of the underlying
//! blob. Deletes are idempotent; removing an absent key is not an error.

use chrono::{DateTime, Utc};
use sqlx::FromRow;

use crate::error::Result;
use crate::models::{DeliveryMode, FileRecord};

use super::DbPool;

/// Database row for file records.
#[derive(Debug, FromRow)]
struct FileRow {
    id: String,
    filename: String,
    content_type: String,
    size_bytes: i64,
    checksum: String,
    channel_id: Option<String>,
    message_id: Option<String>,
    mode: Option<String>,
    created_at: String,
}

impl From<FileRow> for FileRecord {
    fn from(row: FileRow) -> Self {
        Self {
            id: row.id,
            filename: row.filename,
            content_type: row.content_type,
            size: row.size_bytes,
            checksum: row.checksum,
            channel_id: row.channel_id,
            message_id: row.message_id,
            mode: row.mode.as_deref().and_then(DeliveryMode::parse),
            created_at: DateTime::parse_from_rfc3339(&row.created_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
        }
    }
}

/// Insert a file record into the index.
pub async fn insert_file_record(pool: &DbPool, record: &FileRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO files (
            id, filename, content_type, size_bytes, checksum,
            channel_id, message_id, mode, created_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.id)
    .bind(&record.filename)
    .bind(&record.content_type)
    .bind(record.size)
    .bind(&record.checksum)
    .bind(&record.channel_id)
    .bind(&record.message_id)
    .bind(record.mode.map(|m| m.as_str()))
    .bind(record.created_at.to_rfc3339())
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a file record by its full namespaced identifier.
pub async fn get_file_record(pool: &DbPool, id: &str) -> Result<Option<FileRecord>> {
    let row: Option<FileRow> = sqlx::query_as(
        r#"
        SELECT id, filename, content_type, size_bytes, checksum,
               channel_id, message_id, mode, created_at
        FROM files
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(Into::into))
}

/// Delete a file record. Idempotent: deleting an absent key succeeds.
pub async fn delete_file_record(pool: &DbPool, id: &str) -> Result<()> {
    sqlx::query("DELETE FROM files WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(())
}

/// List file records, newest first.
pub async fn list_file_records(pool: &DbPool, limit: i64, offset: i64) -> Result<Vec<FileRecord>> {
    let rows: Vec<FileRow> = sqlx::query_as(
        r#"
        SELECT id, filename, content_type, size_bytes, checksum,
               channel_id, message_id, mode, created_at
        FROM files
        ORDER BY created_at DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;

    Ok(rows.into_iter().map(Into::into).collect())
}

/// Count all file records.
pub async fn count_file_records(pool: &DbPool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM files")
        .fetch_one(pool)
        .await?;

    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn test_pool() -> DbPool {
        let pool = db::init_pool(":memory:").await.unwrap();
        db::initialize_schema(&pool).await.unwrap();
        pool
    }

    fn sample_record(id: &str) -> FileRecord {
        FileRecord {
            id: id.to_string(),
            filename: "report.pdf".into(),
            content_type: "application/pdf".into(),
            size: 1024,
            checksum: "deadbeef".into(),
            channel_id: Some("111".into()),
            message_id: Some("222".into()),
            mode: Some(DeliveryMode::Bot),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let pool = test_pool().await;
        insert_file_record(&pool, &sample_record("abc")).await.unwrap();

        let fetched = get_file_record(&pool, "abc").await.unwrap().unwrap();
        assert_eq!(fetched.filename, "report.pdf");
        assert_eq!(fetched.mode, Some(DeliveryMode::Bot));
        assert_eq!(fetched.message_id.as_deref(), Some("222"));

        assert!(get_file_record(&pool, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let pool = test_pool().await;
        insert_file_record(&pool, &sample_record("abc")).await.unwrap();

        delete_file_record(&pool, "abc").await.unwrap();
        assert!(get_file_record(&pool, "abc").await.unwrap().is_none());

        // Deleting again is not an error
        delete_file_record(&pool, "abc").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_and_count() {
        let pool = test_pool().await;
        insert_file_record(&pool, &sample_record("a")).await.unwrap();
        insert_file_record(&pool, &sample_record("b")).await.unwrap();

        let all = list_file_records(&pool, 10, 0).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(count_file_records(&pool).await.unwrap(), 2);

        let one = list_file_records(&pool, 1, 0).await.unwrap();
        assert_eq!(one.len(), 1);
    }
}
