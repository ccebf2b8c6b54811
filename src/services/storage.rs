//! Storage coordinators: ordered failover across the two Discord paths.
//!
//! The privileged bot path is always tried before the unprivileged
//! webhook path; the ordering is the fallback policy. Backends are
//! attempted strictly sequentially — a concurrent race could produce two
//! uploads for one logical request. A backend is skipped when its
//! credentials are absent; each enabled backend gets exactly one attempt.

use serde::Serialize;
use tracing::{debug, warn};

use crate::config::DiscordConfig;
use crate::error::{BackendFailure, Error, Result};
use crate::models::DeliveryMode;

use super::attachment::{first_attachment, StoredAttachment};
use super::{DiscordBotService, WebhookService};

const BOT_LABEL: &str = "bot";
const WEBHOOK_LABEL: &str = "webhook";

/// Successful upload, tagged with the backend that produced it.
#[derive(Debug, Clone)]
pub struct UploadReceipt {
    pub attachment: StoredAttachment,
    pub mode: DeliveryMode,
}

/// Outcome of a lookup across backends.
#[derive(Debug, Clone)]
pub enum LookupOutcome {
    /// A backend returned the message and it carried an attachment.
    Found {
        attachment: StoredAttachment,
        mode: DeliveryMode,
    },
    /// Every attempted backend authoritatively reported the message
    /// missing (or present without an attachment).
    Absent,
}

/// Merged health report across configured backends.
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub mode: Option<DeliveryMode>,
    pub name: Option<String>,
    pub channel_id: Option<String>,
}

impl ConnectionStatus {
    fn disconnected() -> Self {
        Self {
            connected: false,
            mode: None,
            name: None,
            channel_id: None,
        }
    }
}

/// Coordinates uploads, lookups, and deletions across the configured
/// Discord credential paths.
///
/// Configuration is injected as a value at construction; enablement is
/// derived purely from which credentials are present.
pub struct StorageService {
    bot: DiscordBotService,
    webhook: WebhookService,
    discord: DiscordConfig,
}

impl StorageService {
    pub fn new(bot: DiscordBotService, webhook: WebhookService, discord: DiscordConfig) -> Self {
        Self {
            bot,
            webhook,
            discord,
        }
    }

    /// Upload a file through the first backend that accepts it.
    ///
    /// Bot first, webhook second; the first structural success (a message
    /// with an attachment) returns immediately and no further backend is
    /// tried. When every enabled backend fails the labeled errors are
    /// aggregated so operators can tell the attempts apart. Partial
    /// remote state created by a failing attempt is not rolled back.
    pub async fn upload(
        &self,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<UploadReceipt> {
        if !self.discord.bot_upload_enabled() && !self.discord.webhook_enabled() {
            return Err(Error::NoBackendConfigured);
        }

        let mut failures: Vec<BackendFailure> = Vec::new();

        if let (Some(token), Some(channel_id)) =
            (&self.discord.bot_token, &self.discord.channel_id)
        {
            match self
                .bot
                .create_message(token, channel_id, filename, content_type, bytes.clone())
                .await
            {
                Ok(message) => match first_attachment(&message) {
                    Some(attachment) => {
                        return Ok(UploadReceipt {
                            attachment,
                            mode: DeliveryMode::Bot,
                        });
                    }
                    None => failures.push(BackendFailure {
                        backend: BOT_LABEL,
                        message: "response carried no attachment".into(),
                    }),
                },
                Err(e) => {
                    warn!(filename = %filename, error = %e, "Bot upload failed, trying next backend");
                    failures.push(BackendFailure {
                        backend: BOT_LABEL,
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(webhook_url) = &self.discord.webhook_url {
            match self
                .webhook
                .create_message(webhook_url, filename, content_type, bytes)
                .await
            {
                Ok(message) => match first_attachment(&message) {
                    Some(attachment) => {
                        return Ok(UploadReceipt {
                            attachment,
                            mode: DeliveryMode::Webhook,
                        });
                    }
                    None => failures.push(BackendFailure {
                        backend: WEBHOOK_LABEL,
                        message: "response carried no attachment".into(),
                    }),
                },
                Err(e) => {
                    warn!(filename = %filename, error = %e, "Webhook upload failed");
                    failures.push(BackendFailure {
                        backend: WEBHOOK_LABEL,
                        message: e.to_string(),
                    });
                }
            }
        }

        Err(Error::BackendsFailed(failures))
    }

    /// Resolve the attachment for a stored message.
    ///
    /// Each backend attempt concludes in one of three states: found
    /// (short-circuits), confirmed absent (the backend says the message
    /// does not exist — the next backend is still consulted), or
    /// transport failure (recorded and the next backend is tried). With
    /// no backend configured this is a configuration error, distinct
    /// from absence. If nothing was found and any attempt failed in
    /// transport, the aggregated errors are surfaced: the caller must
    /// not be told "deleted" when the truth might be "outage".
    pub async fn lookup(&self, channel_id: &str, message_id: &str) -> Result<LookupOutcome> {
        if !self.discord.any_enabled() {
            return Err(Error::NoBackendConfigured);
        }

        let mut failures: Vec<BackendFailure> = Vec::new();

        if let Some(token) = &self.discord.bot_token {
            match self.bot.fetch_message(token, channel_id, message_id).await {
                Ok(Some(message)) => {
                    if let Some(attachment) = first_attachment(&message) {
                        return Ok(LookupOutcome::Found {
                            attachment,
                            mode: DeliveryMode::Bot,
                        });
                    }
                    debug!(message_id = %message_id, "Bot found message without attachment");
                }
                Ok(None) => {
                    debug!(message_id = %message_id, "Bot reports message absent");
                }
                Err(e) => {
                    warn!(message_id = %message_id, error = %e, "Bot lookup failed, trying next backend");
                    failures.push(BackendFailure {
                        backend: BOT_LABEL,
                        message: e.to_string(),
                    });
                }
            }
        }

        if let Some(webhook_url) = &self.discord.webhook_url {
            match self.webhook.fetch_message(webhook_url, message_id).await {
                Ok(Some(message)) => {
                    if let Some(attachment) = first_attachment(&message) {
                        return Ok(LookupOutcome::Found {
                            attachment,
                            mode: DeliveryMode::Webhook,
                        });
                    }
                    debug!(message_id = %message_id, "Webhook found message without attachment");
                }
                Ok(None) => {
                    debug!(message_id = %message_id, "Webhook reports message absent");
                }
                Err(e) => {
                    warn!(message_id = %message_id, error = %e, "Webhook lookup failed");
                    failures.push(BackendFailure {
                        backend: WEBHOOK_LABEL,
                        message: e.to_string(),
                    });
                }
            }
        }

        if !failures.is_empty() {
            return Err(Error::BackendsFailed(failures));
        }

        Ok(LookupOutcome::Absent)
    }

    /// Best-effort delete of a stored message. Never raises.
    ///
    /// Returns true as soon as any backend reports the delete succeeded;
    /// false otherwise, including when no backend is configured. Callers
    /// that need to know why a delete failed go through the purge path.
    pub async fn delete(&self, channel_id: &str, message_id: &str) -> bool {
        if let Some(token) = &self.discord.bot_token {
            match self.bot.delete_message(token, channel_id, message_id).await {
                Ok(true) => return true,
                Ok(false) => {
                    debug!(message_id = %message_id, "Bot declined the delete, falling through");
                }
                Err(e) => {
                    warn!(message_id = %message_id, error = %e, "Bot delete failed, falling through");
                }
            }
        }

        if let Some(webhook_url) = &self.discord.webhook_url {
            match self.webhook.delete_message(webhook_url, message_id).await {
                Ok(deleted) => return deleted,
                Err(e) => {
                    warn!(message_id = %message_id, error = %e, "Webhook delete failed");
                }
            }
        }

        false
    }

    /// Probe each configured backend independently and merge the results.
    ///
    /// Unlike upload and lookup there is no short-circuit: the point is a
    /// composite report. Probe failures are swallowed — a health check
    /// never raises.
    pub async fn check_connection(&self) -> ConnectionStatus {
        let bot_channel = match (&self.discord.bot_token, &self.discord.channel_id) {
            (Some(token), Some(channel_id)) => {
                match self.bot.fetch_channel(token, channel_id).await {
                    Ok(channel) => Some(channel),
                    Err(e) => {
                        debug!(error = %e, "Bot health probe failed");
                        None
                    }
                }
            }
            _ => None,
        };

        let webhook_info = match &self.discord.webhook_url {
            Some(webhook_url) => match self.webhook.probe(webhook_url).await {
                Ok(info) => Some(info),
                Err(e) => {
                    debug!(error = %e, "Webhook health probe failed");
                    None
                }
            },
            None => None,
        };

        match (bot_channel, webhook_info) {
            (Some(channel), Some(webhook)) => ConnectionStatus {
                connected: true,
                mode: Some(DeliveryMode::Both),
                name: channel.name.or(webhook.name),
                channel_id: Some(channel.id),
            },
            (Some(channel), None) => ConnectionStatus {
                connected: true,
                mode: Some(DeliveryMode::Bot),
                name: channel.name,
                channel_id: Some(channel.id),
            },
            (None, Some(webhook)) => ConnectionStatus {
                connected: true,
                mode: Some(DeliveryMode::Webhook),
                name: webhook.name,
                channel_id: webhook.channel_id,
            },
            (None, None) => ConnectionStatus::disconnected(),
        }
    }
}
