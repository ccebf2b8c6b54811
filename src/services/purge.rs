//! Cross-store purge keyed by a namespaced file identifier.
//!
//! The identifier's reserved prefix is the sole discriminator for where
//! the payload lives. Bucket deletes are best-effort: a failure is
//! logged and metadata deletion proceeds anyway, favoring "the file
//! becomes unreachable through this service" over "the bytes are
//! reclaimed". Chat-hosted payloads are never contacted here — the
//! owning platform may not permit deleting channel content with our
//! credentials, and removing the record is what makes the file
//! unreachable.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use crate::db::{self, DbPool};
use crate::error::Result;
use crate::models::FileIdentifier;

use super::BucketService;

/// Service for removing a file's object and metadata.
pub struct PurgeService {
    db: DbPool,
    bucket: Option<Arc<BucketService>>,
}

/// Result of a purge. `deleted` is true once the metadata delete has been
/// attempted; the metadata store's delete is idempotent.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeReceipt {
    pub deleted: bool,
    pub id: String,
}

impl PurgeService {
    pub fn new(db: DbPool, bucket: Option<Arc<BucketService>>) -> Self {
        Self { db, bucket }
    }

    /// Remove the underlying bucket object (when bucket-backed) and the
    /// metadata record for the given identifier.
    pub async fn purge(&self, raw_id: &str) -> Result<PurgeReceipt> {
        let identifier = FileIdentifier::parse(raw_id);

        if let FileIdentifier::Bucket(key) = &identifier {
            match &self.bucket {
                Some(bucket) => {
                    if let Err(e) = bucket.delete(key).await {
                        warn!(key = %key, error = %e, "Bucket delete failed; removing metadata anyway");
                    }
                }
                None => {
                    warn!(key = %key, "Bucket not configured; skipping object delete");
                }
            }
        }

        // The metadata record is keyed by the full namespaced identifier.
        db::delete_file_record(&self.db, raw_id).await?;

        info!(file_id = %raw_id, "Purged file record");

        Ok(PurgeReceipt {
            deleted: true,
            id: raw_id.to_string(),
        })
    }
}
