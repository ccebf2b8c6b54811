//! Application state for Chute.
//!
//! Contains the shared state that is passed to all handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::config;
use crate::db::DbPool;
use crate::services::{
    BucketService, DiscordBotService, PurgeService, StorageService, WebhookService,
};
use crate::Result;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Metadata index pool.
    pub db: DbPool,
    /// Upload/lookup/delete coordinator over the Discord paths.
    pub storage: Arc<StorageService>,
    /// Object-storage bucket, when configured.
    pub bucket: Option<Arc<BucketService>>,
    /// Cross-store purge service.
    pub purge: Arc<PurgeService>,
    /// Plain HTTP client used by the download proxy.
    pub http: reqwest::Client,
}

impl AppState {
    /// Create a new application state, initializing all services.
    pub async fn new() -> Result<Self> {
        let config = config::config();

        let db = crate::db::init_pool(&config.database.path).await?;
        crate::db::initialize_schema(&db).await?;

        let bot = match &config.discord.api_base {
            Some(base) => DiscordBotService::with_base_url(base),
            None => DiscordBotService::new(),
        };
        let webhook = WebhookService::new();
        let storage = Arc::new(StorageService::new(
            bot,
            webhook,
            config.discord.clone(),
        ));

        let bucket = BucketService::from_config(&config.bucket).await.map(Arc::new);
        let purge = Arc::new(PurgeService::new(db.clone(), bucket.clone()));

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .user_agent("Chute/1.0")
            .build()
            .expect("Failed to create HTTP client");

        Ok(Self {
            db,
            storage,
            bucket,
            purge,
            http,
        })
    }
}
