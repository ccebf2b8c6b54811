//! Unprivileged Discord webhook client.
//!
//! Addressed purely by the webhook URL; can only touch messages it
//! created or can name by message id. The `wait` query flag is a
//! transport-only concern on create (it makes Discord return the created
//! message synchronously) and must never leak into lookup or delete URLs.

use std::time::Duration;

use reqwest::{multipart, Client, StatusCode};
use serde::Deserialize;
use url::Url;

use crate::error::{Error, Result};

use super::attachment::DiscordMessage;

/// Client for the webhook credential path.
#[derive(Clone)]
pub struct WebhookService {
    client: Client,
}

/// Webhook metadata returned by the health probe.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub channel_id: Option<String>,
}

/// Build the URL addressing either the webhook's generic post endpoint or
/// a specific previously-posted message under it.
///
/// All query parameters on the base URL (e.g. `thread_id`) are copied to
/// the result except the transport-only `wait` flag. A trailing slash on
/// the base path is normalized away before appending `/messages/{id}`.
pub fn resolve_message_url(base: &str, message_id: Option<&str>) -> Result<Url> {
    let parsed = Url::parse(base)
        .map_err(|e| Error::Validation(format!("Invalid webhook URL: {}", e)))?;

    let mut url = parsed.clone();
    url.set_query(None);

    if let Some(id) = message_id {
        let path = format!("{}/messages/{}", parsed.path().trim_end_matches('/'), id);
        url.set_path(&path);
    }

    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .filter(|(key, _)| key != "wait")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    if !pairs.is_empty() {
        url.query_pairs_mut().extend_pairs(pairs);
    }

    Ok(url)
}

impl WebhookService {
    pub fn new() -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Chute/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }

    /// Post a file to the webhook, waiting for the created message.
    pub async fn create_message(
        &self,
        webhook_url: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<DiscordMessage> {
        let mut url = resolve_message_url(webhook_url, None)?;
        url.query_pairs_mut().append_pair("wait", "true");

        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| Error::Validation(format!("Invalid content type: {}", e)))?;
        let form = multipart::Form::new().part("files[0]", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Webhook(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Webhook(format!(
                "Webhook error {}: {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Webhook(format!("Invalid response: {}", e)))
    }

    /// Fetch a message previously posted through this webhook.
    ///
    /// Returns Ok(None) when the webhook authoritatively reports the
    /// message does not exist.
    pub async fn fetch_message(
        &self,
        webhook_url: &str,
        message_id: &str,
    ) -> Result<Option<DiscordMessage>> {
        let url = resolve_message_url(webhook_url, Some(message_id))?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Webhook(format!("Request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Webhook(format!(
                "Webhook error {}: {}",
                status, text
            )));
        }

        let message = response
            .json()
            .await
            .map_err(|e| Error::Webhook(format!("Invalid response: {}", e)))?;

        Ok(Some(message))
    }

    /// Delete a message by id. Returns whether the webhook reported
    /// success (HTTP success or no-content).
    pub async fn delete_message(&self, webhook_url: &str, message_id: &str) -> Result<bool> {
        let url = resolve_message_url(webhook_url, Some(message_id))?;

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .map_err(|e| Error::Webhook(format!("Request failed: {}", e)))?;

        let status = response.status();
        Ok(status.is_success() || status == StatusCode::NO_CONTENT)
    }

    /// Fetch the webhook object itself. Used as the connectivity probe
    /// for the unprivileged path.
    pub async fn probe(&self, webhook_url: &str) -> Result<WebhookInfo> {
        let url = resolve_message_url(webhook_url, None)?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Webhook(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Webhook(format!(
                "Webhook error {}: {}",
                status, text
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::Webhook(format!("Invalid response: {}", e)))
    }
}

impl Default for WebhookService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_strips_wait_and_keeps_thread_id() {
        let url = resolve_message_url(
            "https://host/webhooks/1/tok?thread_id=5&wait=true",
            Some("42"),
        )
        .unwrap();

        assert_eq!(
            url.as_str(),
            "https://host/webhooks/1/tok/messages/42?thread_id=5"
        );
    }

    #[test]
    fn test_resolve_without_message_id_targets_post_endpoint() {
        let url =
            resolve_message_url("https://host/webhooks/1/tok?wait=true", None).unwrap();
        assert_eq!(url.as_str(), "https://host/webhooks/1/tok");
    }

    #[test]
    fn test_resolve_normalizes_trailing_slash() {
        let url = resolve_message_url("https://host/webhooks/1/tok/", Some("42")).unwrap();
        assert_eq!(url.as_str(), "https://host/webhooks/1/tok/messages/42");
    }

    #[test]
    fn test_resolve_preserves_multiple_params() {
        let url = resolve_message_url(
            "https://host/webhooks/1/tok?thread_id=5&foo=bar&wait=1",
            Some("7"),
        )
        .unwrap();

        assert_eq!(
            url.as_str(),
            "https://host/webhooks/1/tok/messages/7?thread_id=5&foo=bar"
        );
    }

    #[test]
    fn test_resolve_rejects_invalid_url() {
        assert!(resolve_message_url("not a url", Some("1")).is_err());
    }
}
