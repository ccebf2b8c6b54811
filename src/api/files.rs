//! File Routes
//!
//! Upload, metadata, download, and deletion for hosted files.
//!
//! Uploads small enough for a Discord attachment go through the storage
//! coordinator (bot path first, webhook fallback); larger uploads go to
//! the bucket when one is configured. Discord CDN links expire, so GET
//! re-resolves a fresh URL through the lookup coordinator instead of
//! serving the URL captured at upload time.
//!
//! Routes:
//! - GET /api/files - List file records
//! - POST /api/files - Upload a file
//! - GET /api/files/:id - File metadata plus a freshly resolved URL
//! - GET /api/files/:id/download - Stream the payload through the proxy
//! - DELETE /api/files/:id - Delete the message (best effort) and purge

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::header,
    response::Response,
    routing::get,
    Json, Router,
};
use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::{Deserialize, Serialize};

use crate::models::{DeliveryMode, FileIdentifier, FileRecord};
use crate::services::{LookupOutcome, PurgeReceipt};
use crate::{db, AppState, Error, Result};

/// Build file routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_files).post(upload_file))
        .route("/:file_id", get(get_file).delete(delete_file))
        .route("/:file_id/download", get(download_file))
        .layer(axum::middleware::from_fn(crate::middleware::require_token))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// File record response.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub id: String,
    /// Fetchable URL for the payload, when one could be resolved.
    pub url: Option<String>,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    pub checksum: String,
    pub mode: Option<DeliveryMode>,
    pub created_at: DateTime<Utc>,
}

impl FileResponse {
    fn from_record(record: FileRecord, url: Option<String>) -> Self {
        Self {
            id: record.id,
            url,
            filename: record.filename,
            content_type: record.content_type,
            size: record.size,
            checksum: record.checksum,
            mode: record.mode,
            created_at: record.created_at,
        }
    }
}

/// List files response.
#[derive(Debug, Serialize)]
pub struct ListFilesResponse {
    pub files: Vec<FileResponse>,
    pub total: i64,
}

/// Query parameters for listing files.
#[derive(Debug, Deserialize, Default)]
pub struct ListFilesQuery {
    #[serde(default)]
    pub offset: i64,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

// ============================================================================
// Path Extractors
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct FilePath {
    pub file_id: String,
}

// ============================================================================
// Handlers
// ============================================================================

/// List file records, newest first.
///
/// GET /api/files
///
/// Listing is metadata-only; URLs are resolved per file on demand.
#[axum::debug_handler]
async fn list_files(
    State(state): State<AppState>,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<ListFilesResponse>> {
    let limit = query.limit.clamp(1, 200);
    let offset = query.offset.max(0);

    let records = db::list_file_records(&state.db, limit, offset).await?;
    let total = db::count_file_records(&state.db).await?;

    let files = records
        .into_iter()
        .map(|r| FileResponse::from_record(r, None))
        .collect();

    Ok(Json(ListFilesResponse { files, total }))
}

/// Upload a file.
///
/// POST /api/files
///
/// Accepts multipart/form-data with a single file field named "file".
#[axum::debug_handler]
async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<FileResponse>> {
    let config = crate::config();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        Error::InvalidInput(format!("Failed to read multipart field: {}", e))
    })? {
        let field_name = field.name().unwrap_or_default().to_string();

        if field_name != "file" {
            continue;
        }

        let filename = field
            .file_name()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "unnamed".into());

        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| {
                mime_guess::from_path(&filename)
                    .first_or_octet_stream()
                    .to_string()
            });

        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidInput(format!("Failed to read file: {}", e)))?
            .to_vec();

        if data.len() > config.storage.max_upload_size {
            return Err(Error::FileTooLarge {
                max_size: config.storage.max_upload_size,
            });
        }

        let checksum = calculate_checksum(&data);
        let size = data.len() as i64;
        let created_at = Utc::now();

        // Oversized-for-Discord uploads go to the bucket when available.
        let (record, url) = if data.len() > config.storage.attachment_size_limit {
            let Some(bucket) = &state.bucket else {
                return Err(Error::FileTooLarge {
                    max_size: config.storage.attachment_size_limit,
                });
            };

            let key = bucket_key(&filename);
            bucket.put(&key, &content_type, data).await?;

            let id = FileIdentifier::for_bucket_key(&key).to_string();
            tracing::info!(file_id = %id, size = size, "Stored file in bucket");

            let record = FileRecord {
                id,
                filename,
                content_type,
                size,
                checksum,
                channel_id: None,
                message_id: None,
                mode: None,
                created_at,
            };
            let url = bucket.object_url(&key);
            (record, url)
        } else {
            let receipt = state
                .storage
                .upload(&filename, &content_type, data)
                .await?;

            let id = nanoid!();
            tracing::info!(
                file_id = %id,
                mode = %receipt.mode,
                size = size,
                "Stored file as chat attachment"
            );

            let record = FileRecord {
                id,
                filename,
                content_type,
                size,
                checksum,
                channel_id: receipt.attachment.channel_id.clone(),
                message_id: receipt.attachment.message_id.clone(),
                mode: Some(receipt.mode),
                created_at,
            };
            (record, Some(receipt.attachment.url))
        };

        db::insert_file_record(&state.db, &record).await?;

        return Ok(Json(FileResponse::from_record(record, url)));
    }

    Err(Error::InvalidInput("No file provided".into()))
}

/// Get file metadata with a freshly resolved URL.
///
/// GET /api/files/:file_id
///
/// The record is authoritative for presence; `url` is null when no
/// backend could produce a fetchable address.
#[axum::debug_handler]
async fn get_file(
    State(state): State<AppState>,
    Path(path): Path<FilePath>,
) -> Result<Json<FileResponse>> {
    let record = db::get_file_record(&state.db, &path.file_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("File {}", path.file_id)))?;

    let url = resolve_record_url(&state, &record).await?;

    Ok(Json(FileResponse::from_record(record, url)))
}

/// Stream a file's payload through the proxy.
///
/// GET /api/files/:file_id/download
#[axum::debug_handler]
async fn download_file(
    State(state): State<AppState>,
    Path(path): Path<FilePath>,
) -> Result<Response> {
    let record = db::get_file_record(&state.db, &path.file_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("File {}", path.file_id)))?;

    if let FileIdentifier::Bucket(key) = record.identifier() {
        let bucket = state
            .bucket
            .as_ref()
            .ok_or_else(|| Error::FileNotFound(record.id.clone()))?;

        let (data, content_type) = bucket
            .get(&key)
            .await?
            .ok_or_else(|| Error::FileNotFound(record.id.clone()))?;

        return build_download_response(
            &content_type.unwrap_or_else(|| record.content_type.clone()),
            &record.filename,
            Body::from(data),
        );
    }

    let url = resolve_record_url(&state, &record)
        .await?
        .ok_or_else(|| Error::FileNotFound(record.id.clone()))?;

    let upstream = state
        .http
        .get(&url)
        .send()
        .await
        .map_err(|e| Error::Discord(format!("CDN fetch failed: {}", e)))?;

    if !upstream.status().is_success() {
        return Err(Error::Discord(format!(
            "CDN fetch failed: {}",
            upstream.status()
        )));
    }

    build_download_response(
        &record.content_type,
        &record.filename,
        Body::from_stream(upstream.bytes_stream()),
    )
}

/// Delete a file.
///
/// DELETE /api/files/:file_id
///
/// For chat-hosted files the backing message delete is best effort; the
/// purge that follows is what makes the file gone as far as this service
/// is concerned.
#[axum::debug_handler]
async fn delete_file(
    State(state): State<AppState>,
    Path(path): Path<FilePath>,
) -> Result<Json<PurgeReceipt>> {
    let record = db::get_file_record(&state.db, &path.file_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("File {}", path.file_id)))?;

    if !record.identifier().is_bucket() {
        if let (Some(channel_id), Some(message_id)) = (&record.channel_id, &record.message_id) {
            let removed = state.storage.delete(channel_id, message_id).await;
            if !removed {
                tracing::warn!(
                    file_id = %record.id,
                    message_id = %message_id,
                    "Backing message could not be deleted; purging metadata anyway"
                );
            }
        }
    }

    let receipt = state.purge.purge(&record.id).await?;

    Ok(Json(receipt))
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Resolve a fresh fetchable URL for a record's payload.
async fn resolve_record_url(state: &AppState, record: &FileRecord) -> Result<Option<String>> {
    match record.identifier() {
        FileIdentifier::Bucket(key) => {
            Ok(state.bucket.as_ref().and_then(|b| b.object_url(&key)))
        }
        FileIdentifier::Index(_) => {
            let (channel_id, message_id) = match (&record.channel_id, &record.message_id) {
                (Some(c), Some(m)) => (c.clone(), m.clone()),
                _ => return Ok(None),
            };

            match state.storage.lookup(&channel_id, &message_id).await? {
                LookupOutcome::Found { attachment, .. } => Ok(Some(attachment.url)),
                LookupOutcome::Absent => Ok(None),
            }
        }
    }
}

fn build_download_response(content_type: &str, filename: &str, body: Body) -> Result<Response> {
    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(body)
        .map_err(|e| Error::Internal(format!("Failed to build response: {}", e)))
}

/// Calculate SHA-256 checksum of data.
fn calculate_checksum(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Bucket key for a new upload: random id plus the original extension so
/// public URLs keep a usable suffix.
fn bucket_key(filename: &str) -> String {
    let id = nanoid!();
    match std::path::Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
    {
        Some(ext) if !ext.is_empty() => format!("{}.{}", id, ext.to_lowercase()),
        _ => id,
    }
}
