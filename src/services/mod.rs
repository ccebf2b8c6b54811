//! Service layer for Chute.
//!
//! Contains the storage backends and the failover logic on top of them:
//! - DiscordBot (privileged bot-token API client)
//! - Webhook (unprivileged webhook API client)
//! - Attachment (canonical descriptor extracted from raw messages)
//! - Storage (upload/lookup/delete coordinators with ordered failover)
//! - Bucket (S3-compatible object store, e.g. Cloudflare R2)
//! - Purge (cross-store deletion keyed by namespaced identifiers)

pub mod attachment;
mod bucket;
mod discord_bot;
mod purge;
mod storage;
mod webhook;

pub use attachment::{first_attachment, DiscordAttachment, DiscordMessage, StoredAttachment};
pub use bucket::BucketService;
pub use discord_bot::{ChannelInfo, DiscordBotService};
pub use purge::{PurgeReceipt, PurgeService};
pub use storage::{ConnectionStatus, LookupOutcome, StorageService, UploadReceipt};
pub use webhook::{resolve_message_url, WebhookInfo, WebhookService};
