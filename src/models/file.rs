//! File identifiers and metadata records.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reserved prefix marking bucket-backed identifiers.
pub const BUCKET_PREFIX: &str = "r2:";

/// Where a stored file's payload lives.
///
/// Identifiers are namespaced strings: `r2:{key}` names an object in the
/// bucket; everything else names a record held only in the metadata index,
/// whose payload is a chat attachment addressed by the channel and message
/// ids stored in that record. The prefix is the sole discriminator; parse
/// it once at the boundary rather than re-checking the string ad hoc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileIdentifier {
    /// Object in the S3-compatible bucket. Holds the bucket key with the
    /// prefix already stripped.
    Bucket(String),
    /// Record addressed through the metadata index only.
    Index(String),
}

impl FileIdentifier {
    /// Parse a raw identifier into its tagged variant.
    pub fn parse(raw: &str) -> Self {
        match raw.strip_prefix(BUCKET_PREFIX) {
            Some(key) => Self::Bucket(key.to_string()),
            None => Self::Index(raw.to_string()),
        }
    }

    /// Build a bucket-backed identifier from a bucket key.
    pub fn for_bucket_key(key: &str) -> Self {
        Self::Bucket(key.to_string())
    }

    /// The bucket key, if this identifier is bucket-backed.
    pub fn bucket_key(&self) -> Option<&str> {
        match self {
            Self::Bucket(key) => Some(key),
            Self::Index(_) => None,
        }
    }

    pub fn is_bucket(&self) -> bool {
        matches!(self, Self::Bucket(_))
    }
}

impl fmt::Display for FileIdentifier {
    /// Renders the full namespaced form used as the metadata key.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bucket(key) => write!(f, "{}{}", BUCKET_PREFIX, key),
            Self::Index(id) => write!(f, "{}", id),
        }
    }
}

/// Which credential path served a backend interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    /// Privileged bot-token API.
    Bot,
    /// Unprivileged webhook API.
    Webhook,
    /// Composite, used by health reports when both paths answer.
    Both,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bot => "bot",
            Self::Webhook => "webhook",
            Self::Both => "both",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "bot" => Some(Self::Bot),
            "webhook" => Some(Self::Webhook),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-file metadata record held in the index.
///
/// The record's existence is authoritative for whether a file is present:
/// purging deletes the record even when the underlying blob delete fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    /// Full namespaced identifier (metadata key).
    pub id: String,
    pub filename: String,
    pub content_type: String,
    pub size: i64,
    /// SHA-256 of the payload, hex-encoded.
    pub checksum: String,
    /// Channel the attachment was posted to (chat-hosted files only).
    pub channel_id: Option<String>,
    /// Message carrying the attachment (chat-hosted files only).
    pub message_id: Option<String>,
    /// Backend that accepted the upload. None for bucket-backed files.
    pub mode: Option<DeliveryMode>,
    pub created_at: DateTime<Utc>,
}

impl FileRecord {
    /// The parsed identifier for this record.
    pub fn identifier(&self) -> FileIdentifier {
        FileIdentifier::parse(&self.id)
    }
}
