//! Privileged Discord API client.
//!
//! Authenticates with a bot token and can create, fetch, and delete
//! arbitrary messages within the bot's permission scope. API errors carry
//! an HTTP status and, when Discord supplies one, the JSON `message`
//! field from the error body.

use std::time::Duration;

use reqwest::{header, multipart, Client, StatusCode};
use serde::Deserialize;

use crate::error::{Error, Result};

use super::attachment::DiscordMessage;

const DISCORD_API_URL: &str = "https://discord.com/api/v10";

/// Client for the bot-token credential path.
#[derive(Clone)]
pub struct DiscordBotService {
    client: Client,
    api_base: String,
}

/// Channel metadata returned by the health probe.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelInfo {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl DiscordBotService {
    /// Create a new bot API client against the public Discord endpoint.
    pub fn new() -> Self {
        Self::with_base_url(DISCORD_API_URL)
    }

    /// Create a client against a custom base URL (used by tests).
    pub fn with_base_url(base: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Chute/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            api_base: base.into().trim_end_matches('/').to_string(),
        }
    }

    /// Build headers with bot authentication.
    fn build_headers(&self, token: &str) -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            format!("Bot {}", token).parse().unwrap(),
        );
        headers
    }

    /// Post a message carrying a single file attachment to a channel.
    pub async fn create_message(
        &self,
        token: &str,
        channel_id: &str,
        filename: &str,
        content_type: &str,
        bytes: Vec<u8>,
    ) -> Result<DiscordMessage> {
        let url = format!("{}/channels/{}/messages", self.api_base, channel_id);

        let part = multipart::Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| Error::Validation(format!("Invalid content type: {}", e)))?;
        let form = multipart::Form::new().part("files[0]", part);

        let response = self
            .client
            .post(&url)
            .headers(self.build_headers(token))
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Discord(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| Error::Discord(format!("Invalid response: {}", e)))
    }

    /// Fetch a message by channel and message id.
    ///
    /// Returns Ok(None) when Discord authoritatively reports the message
    /// does not exist; transport and auth failures are errors.
    pub async fn fetch_message(
        &self,
        token: &str,
        channel_id: &str,
        message_id: &str,
    ) -> Result<Option<DiscordMessage>> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.api_base, channel_id, message_id
        );

        let response = self
            .client
            .get(&url)
            .headers(self.build_headers(token))
            .send()
            .await
            .map_err(|e| Error::Discord(format!("Request failed: {}", e)))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        let message = response
            .json()
            .await
            .map_err(|e| Error::Discord(format!("Invalid response: {}", e)))?;

        Ok(Some(message))
    }

    /// Delete a message. Returns whether Discord reported success.
    pub async fn delete_message(
        &self,
        token: &str,
        channel_id: &str,
        message_id: &str,
    ) -> Result<bool> {
        let url = format!(
            "{}/channels/{}/messages/{}",
            self.api_base, channel_id, message_id
        );

        let response = self
            .client
            .delete(&url)
            .headers(self.build_headers(token))
            .send()
            .await
            .map_err(|e| Error::Discord(format!("Request failed: {}", e)))?;

        let status = response.status();
        Ok(status.is_success() || status == StatusCode::NO_CONTENT)
    }

    /// Fetch channel metadata. Used as the connectivity probe for the
    /// privileged path.
    pub async fn fetch_channel(&self, token: &str, channel_id: &str) -> Result<ChannelInfo> {
        let url = format!("{}/channels/{}", self.api_base, channel_id);

        let response = self
            .client
            .get(&url)
            .headers(self.build_headers(token))
            .send()
            .await
            .map_err(|e| Error::Discord(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| Error::Discord(format!("Invalid response: {}", e)))
    }
}

impl Default for DiscordBotService {
    fn default() -> Self {
        Self::new()
    }
}

/// Build an error from a non-success Discord response, preferring the
/// JSON `message` field over the raw body.
async fn api_error(response: reqwest::Response) -> Error {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or(body);

    Error::Discord(format!("Discord API error {}: {}", status, detail))
}
