//! Canonical attachment descriptors.
//!
//! Both Discord credential paths return the same raw message shape on
//! create and fetch. This module normalizes it into the descriptor the
//! rest of the system works with.

use serde::{Deserialize, Serialize};

/// Raw message object as returned by the Discord REST API or a webhook.
///
/// Only the fields this service reads are modeled; everything else in the
/// payload is ignored during deserialization.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordMessage {
    pub id: String,
    #[serde(default)]
    pub channel_id: Option<String>,
    #[serde(default)]
    pub attachments: Vec<DiscordAttachment>,
}

/// Raw attachment entry inside a message.
#[derive(Debug, Clone, Deserialize)]
pub struct DiscordAttachment {
    pub id: String,
    pub filename: String,
    pub size: i64,
    pub url: String,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Canonical result of a successful backend interaction.
///
/// `url` is directly fetchable at the moment of creation. Discord CDN
/// links expire after a while; that is a property of the backend, and
/// callers re-resolve through a lookup when they need a fresh one.
#[derive(Debug, Clone, Serialize)]
pub struct StoredAttachment {
    pub url: String,
    pub filename: String,
    pub size: i64,
    pub content_type: String,
    pub attachment_id: String,
    pub channel_id: Option<String>,
    pub message_id: Option<String>,
}

/// Extract the first attachment of a message, if any.
///
/// Returns None when the message carries no attachments. Absence is a
/// legitimate terminal state for lookups, distinct from a transport
/// failure, so this is not an error.
pub fn first_attachment(message: &DiscordMessage) -> Option<StoredAttachment> {
    let attachment = message.attachments.first()?;

    Some(StoredAttachment {
        url: attachment.url.clone(),
        filename: attachment.filename.clone(),
        size: attachment.size,
        content_type: attachment
            .content_type
            .clone()
            .unwrap_or_else(|| "application/octet-stream".to_string()),
        attachment_id: attachment.id.clone(),
        channel_id: message.channel_id.clone(),
        message_id: Some(message.id.clone()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message_json(attachments: serde_json::Value) -> DiscordMessage {
        serde_json::from_value(serde_json::json!({
            "id": "9001",
            "channel_id": "42",
            "attachments": attachments,
        }))
        .unwrap()
    }

    #[test]
    fn test_extracts_first_attachment() {
        let message = message_json(serde_json::json!([
            {
                "id": "a1",
                "filename": "cat.png",
                "size": 512,
                "url": "https://cdn.example.com/a1/cat.png",
                "content_type": "image/png"
            },
            {
                "id": "a2",
                "filename": "dog.png",
                "size": 256,
                "url": "https://cdn.example.com/a2/dog.png"
            }
        ]));

        let stored = first_attachment(&message).unwrap();
        assert_eq!(stored.attachment_id, "a1");
        assert_eq!(stored.filename, "cat.png");
        assert_eq!(stored.content_type, "image/png");
        assert_eq!(stored.channel_id.as_deref(), Some("42"));
        assert_eq!(stored.message_id.as_deref(), Some("9001"));
    }

    #[test]
    fn test_no_attachments_is_absent_not_error() {
        let message = message_json(serde_json::json!([]));
        assert!(first_attachment(&message).is_none());
    }

    #[test]
    fn test_missing_content_type_defaults_to_octet_stream() {
        let message = message_json(serde_json::json!([
            {
                "id": "a1",
                "filename": "blob.bin",
                "size": 10,
                "url": "https://cdn.example.com/a1/blob.bin"
            }
        ]));

        let stored = first_attachment(&message).unwrap();
        assert_eq!(stored.content_type, "application/octet-stream");
    }

    #[test]
    fn test_message_without_channel_id_parses() {
        let message: DiscordMessage = serde_json::from_value(serde_json::json!({
            "id": "1",
            "attachments": [],
        }))
        .unwrap();
        assert!(message.channel_id.is_none());
    }
}
