//! Integration tests for the storage coordinators.
//!
//! A wiremock server stands in for both the Discord REST API and the
//! webhook endpoint, so failover ordering, short-circuiting, and error
//! aggregation are exercised against real HTTP.

use chute::config::DiscordConfig;
use chute::models::DeliveryMode;
use chute::services::{DiscordBotService, LookupOutcome, StorageService, WebhookService};
use chute::Error;
use serde_json::json;
use wiremock::matchers::{method, path, path_regex, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const CHANNEL: &str = "111222333";
const MESSAGE: &str = "444555666";

fn service(server: &MockServer, discord: DiscordConfig) -> StorageService {
    StorageService::new(
        DiscordBotService::with_base_url(server.uri()),
        WebhookService::new(),
        discord,
    )
}

fn both_backends(server: &MockServer) -> DiscordConfig {
    DiscordConfig {
        bot_token: Some("bot-token".into()),
        channel_id: Some(CHANNEL.into()),
        webhook_url: Some(format!("{}/webhooks/1/tok", server.uri())),
        ..Default::default()
    }
}

fn bot_only() -> DiscordConfig {
    DiscordConfig {
        bot_token: Some("bot-token".into()),
        channel_id: Some(CHANNEL.into()),
        ..Default::default()
    }
}

fn webhook_only(server: &MockServer) -> DiscordConfig {
    DiscordConfig {
        webhook_url: Some(format!("{}/webhooks/1/tok", server.uri())),
        ..Default::default()
    }
}

fn message_body(filename: &str) -> serde_json::Value {
    json!({
        "id": MESSAGE,
        "channel_id": CHANNEL,
        "attachments": [{
            "id": "900",
            "filename": filename,
            "size": 42,
            "url": format!("https://cdn.example.com/{}", filename),
            "content_type": "text/plain"
        }]
    })
}

// ============================================================================
// Upload Coordinator Tests
// ============================================================================

#[tokio::test]
async fn test_upload_prefers_bot_and_short_circuits() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/channels/{}/messages", CHANNEL)))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_body("notes.txt")))
        .expect(1)
        .mount(&server)
        .await;

    // The webhook must never be called when the bot succeeds
    Mock::given(method("POST"))
        .and(path("/webhooks/1/tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_body("notes.txt")))
        .expect(0)
        .mount(&server)
        .await;

    let storage = service(&server, both_backends(&server));
    let receipt = storage
        .upload("notes.txt", "text/plain", b"hello".to_vec())
        .await
        .unwrap();

    assert_eq!(receipt.mode, DeliveryMode::Bot);
    assert_eq!(receipt.attachment.filename, "notes.txt");
    assert_eq!(receipt.attachment.message_id.as_deref(), Some(MESSAGE));
}

#[tokio::test]
async fn test_upload_falls_back_to_webhook_on_bot_failure() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/channels/{}/messages", CHANNEL)))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"message": "Missing Access"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/webhooks/1/tok"))
        .and(query_param("wait", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_body("notes.txt")))
        .expect(1)
        .mount(&server)
        .await;

    let storage = service(&server, both_backends(&server));
    let receipt = storage
        .upload("notes.txt", "text/plain", b"hello".to_vec())
        .await
        .unwrap();

    assert_eq!(receipt.mode, DeliveryMode::Webhook);
}

#[tokio::test]
async fn test_upload_never_attempts_bot_when_webhook_only() {
    let server = MockServer::start().await;

    Mock::given(path_regex("^/channels/.*"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/webhooks/1/tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_body("notes.txt")))
        .expect(1)
        .mount(&server)
        .await;

    let storage = service(&server, webhook_only(&server));
    let receipt = storage
        .upload("notes.txt", "text/plain", b"hello".to_vec())
        .await
        .unwrap();

    assert_eq!(receipt.mode, DeliveryMode::Webhook);
}

#[tokio::test]
async fn test_upload_aggregates_labeled_failures() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path(format!("/channels/{}/messages", CHANNEL)))
        .respond_with(
            ResponseTemplate::new(403).set_body_json(json!({"message": "Missing Access"})),
        )
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/webhooks/1/tok"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&server)
        .await;

    let storage = service(&server, both_backends(&server));
    let err = storage
        .upload("notes.txt", "text/plain", b"hello".to_vec())
        .await
        .unwrap_err();

    let failures = err.backend_failures().expect("expected aggregate failure");
    assert_eq!(failures.len(), 2);
    assert_eq!(failures[0].backend, "bot");
    assert!(failures[0].message.contains("Missing Access"));
    assert_eq!(failures[1].backend, "webhook");

    // The rendered message names every attempted backend
    let rendered = err.to_string();
    assert!(rendered.contains("bot:"));
    assert!(rendered.contains("webhook:"));
}

#[tokio::test]
async fn test_upload_with_no_backend_is_a_configuration_error() {
    let server = MockServer::start().await;
    let storage = service(&server, DiscordConfig::default());

    let err = storage
        .upload("notes.txt", "text/plain", b"hello".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoBackendConfigured));
}

// ============================================================================
// Lookup Coordinator Tests
// ============================================================================

#[tokio::test]
async fn test_lookup_found_via_bot() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/channels/{}/messages/{}", CHANNEL, MESSAGE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_body("notes.txt")))
        .mount(&server)
        .await;

    let storage = service(&server, bot_only());
    let outcome = storage.lookup(CHANNEL, MESSAGE).await.unwrap();

    match outcome {
        LookupOutcome::Found { attachment, mode } => {
            assert_eq!(mode, DeliveryMode::Bot);
            assert_eq!(attachment.filename, "notes.txt");
        }
        LookupOutcome::Absent => panic!("expected Found"),
    }
}

#[tokio::test]
async fn test_lookup_not_found_is_confirmed_absent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/channels/{}/messages/{}", CHANNEL, MESSAGE)))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(json!({"message": "Unknown Message"})),
        )
        .mount(&server)
        .await;

    let storage = service(&server, bot_only());
    let outcome = storage.lookup(CHANNEL, MESSAGE).await.unwrap();

    assert!(matches!(outcome, LookupOutcome::Absent));
}

#[tokio::test]
async fn test_lookup_absence_does_not_short_circuit_next_backend() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/channels/{}/messages/{}", CHANNEL, MESSAGE)))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/webhooks/1/tok/messages/{}", MESSAGE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(message_body("notes.txt")))
        .expect(1)
        .mount(&server)
        .await;

    let storage = service(&server, both_backends(&server));
    let outcome = storage.lookup(CHANNEL, MESSAGE).await.unwrap();

    match outcome {
        LookupOutcome::Found { mode, .. } => assert_eq!(mode, DeliveryMode::Webhook),
        LookupOutcome::Absent => panic!("expected the webhook to find the message"),
    }
}

#[tokio::test]
async fn test_lookup_transport_error_is_surfaced_not_absent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/channels/{}/messages/{}", CHANNEL, MESSAGE)))
        .respond_with(ResponseTemplate::new(500).set_body_string("oops"))
        .mount(&server)
        .await;

    let storage = service(&server, bot_only());
    let err = storage.lookup(CHANNEL, MESSAGE).await.unwrap_err();

    let failures = err.backend_failures().expect("expected aggregate failure");
    assert_eq!(failures[0].backend, "bot");
}

#[tokio::test]
async fn test_lookup_with_no_backend_is_distinct_from_absent() {
    let server = MockServer::start().await;
    let storage = service(&server, DiscordConfig::default());

    let err = storage.lookup(CHANNEL, MESSAGE).await.unwrap_err();
    assert!(matches!(err, Error::NoBackendConfigured));
}

#[tokio::test]
async fn test_lookup_message_without_attachment_counts_as_absent() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/channels/{}/messages/{}", CHANNEL, MESSAGE)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": MESSAGE,
            "channel_id": CHANNEL,
            "attachments": []
        })))
        .mount(&server)
        .await;

    let storage = service(&server, bot_only());
    let outcome = storage.lookup(CHANNEL, MESSAGE).await.unwrap();

    assert!(matches!(outcome, LookupOutcome::Absent));
}

// ============================================================================
// Deletion Coordinator Tests
// ============================================================================

#[tokio::test]
async fn test_delete_returns_false_when_nothing_configured() {
    let server = MockServer::start().await;
    let storage = service(&server, DiscordConfig::default());

    assert!(!storage.delete(CHANNEL, MESSAGE).await);
}

#[tokio::test]
async fn test_delete_via_bot() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/channels/{}/messages/{}", CHANNEL, MESSAGE)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let storage = service(&server, bot_only());
    assert!(storage.delete(CHANNEL, MESSAGE).await);
}

#[tokio::test]
async fn test_delete_falls_through_to_webhook() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/channels/{}/messages/{}", CHANNEL, MESSAGE)))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("/webhooks/1/tok/messages/{}", MESSAGE)))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let storage = service(&server, both_backends(&server));
    assert!(storage.delete(CHANNEL, MESSAGE).await);
}

#[tokio::test]
async fn test_delete_both_backends_refuse() {
    let server = MockServer::start().await;

    Mock::given(method("DELETE"))
        .and(path(format!("/channels/{}/messages/{}", CHANNEL, MESSAGE)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    Mock::given(method("DELETE"))
        .and(path(format!("/webhooks/1/tok/messages/{}", MESSAGE)))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let storage = service(&server, both_backends(&server));
    assert!(!storage.delete(CHANNEL, MESSAGE).await);
}

// ============================================================================
// Health Checker Tests
// ============================================================================

#[tokio::test]
async fn test_health_reports_both_when_both_paths_answer() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(format!("/channels/{}", CHANNEL)))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"id": CHANNEL, "name": "files"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/webhooks/1/tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "uploader",
            "channel_id": CHANNEL
        })))
        .expect(1)
        .mount(&server)
        .await;

    let storage = service(&server, both_backends(&server));
    let status = storage.check_connection().await;

    assert!(status.connected);
    assert_eq!(status.mode, Some(DeliveryMode::Both));
    assert_eq!(status.channel_id.as_deref(), Some(CHANNEL));
    assert_eq!(status.name.as_deref(), Some("files"));
}

#[tokio::test]
async fn test_health_reports_the_single_healthy_path() {
    let server = MockServer::start().await;

    // Bot probe fails, webhook answers
    Mock::given(method("GET"))
        .and(path(format!("/channels/{}", CHANNEL)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/webhooks/1/tok"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "name": "uploader",
            "channel_id": CHANNEL
        })))
        .mount(&server)
        .await;

    let storage = service(&server, both_backends(&server));
    let status = storage.check_connection().await;

    assert!(status.connected);
    assert_eq!(status.mode, Some(DeliveryMode::Webhook));
    assert_eq!(status.name.as_deref(), Some("uploader"));
}

#[tokio::test]
async fn test_health_disconnected_when_nothing_configured() {
    let server = MockServer::start().await;
    let storage = service(&server, DiscordConfig::default());

    let status = storage.check_connection().await;

    assert!(!status.connected);
    assert!(status.mode.is_none());
    assert!(status.name.is_none());
}
