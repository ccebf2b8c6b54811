//! Configuration for Chute.
//!
//! All settings come from the environment (a `.env` file is honored via
//! dotenvy). The configuration is materialized once at startup and shared
//! process-wide; backend enablement is derived purely from which credential
//! variables are present.

use std::env;
use std::sync::OnceLock;

/// Default size threshold for routing an upload to Discord rather than
/// the bucket. Discord caps normal attachments at 8 MiB.
const DEFAULT_ATTACHMENT_LIMIT: usize = 8 * 1024 * 1024;

/// Default overall upload cap.
const DEFAULT_MAX_UPLOAD_SIZE: usize = 100 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub discord: DiscordConfig,
    pub bucket: BucketConfig,
    pub storage: StorageConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: String,
}

/// Credentials for the two Discord paths.
///
/// Either path may be absent; a path is enabled exactly when its required
/// fields are present. This struct is handed to the storage coordinators
/// as a value so backend selection never reads the environment ad hoc.
#[derive(Debug, Clone, Default)]
pub struct DiscordConfig {
    /// Bot token for the privileged API path.
    pub bot_token: Option<String>,
    /// Channel uploads are posted to via the bot path.
    pub channel_id: Option<String>,
    /// Full webhook URL for the unprivileged path.
    pub webhook_url: Option<String>,
    /// Override for the Discord REST base URL (tests point this at a mock).
    pub api_base: Option<String>,
}

impl DiscordConfig {
    /// Whether the privileged path can serve lookups and deletes.
    pub fn bot_enabled(&self) -> bool {
        self.bot_token.is_some()
    }

    /// Whether the privileged path can accept uploads (needs a channel too).
    pub fn bot_upload_enabled(&self) -> bool {
        self.bot_token.is_some() && self.channel_id.is_some()
    }

    pub fn webhook_enabled(&self) -> bool {
        self.webhook_url.is_some()
    }

    pub fn any_enabled(&self) -> bool {
        self.bot_enabled() || self.webhook_enabled()
    }
}

/// S3-compatible bucket settings (Cloudflare R2, MinIO, AWS).
#[derive(Debug, Clone, Default)]
pub struct BucketConfig {
    pub endpoint: Option<String>,
    pub bucket: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub region: String,
    /// Public base URL objects are served from, if the bucket is exposed.
    pub public_base_url: Option<String>,
}

impl BucketConfig {
    pub fn enabled(&self) -> bool {
        self.endpoint.is_some()
            && self.bucket.is_some()
            && self.access_key_id.is_some()
            && self.secret_access_key.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Hard cap on accepted upload size.
    pub max_upload_size: usize,
    /// Uploads above this size bypass Discord and go to the bucket.
    pub attachment_size_limit: usize,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Static bearer token required on mutating routes when set.
    pub token: Option<String>,
}

static CONFIG: OnceLock<Config> = OnceLock::new();

/// Initialize configuration from the environment. Safe to call repeatedly;
/// only the first call reads the environment.
pub fn init() -> &'static Config {
    CONFIG.get_or_init(Config::from_env)
}

/// Access the process-wide configuration.
pub fn config() -> &'static Config {
    init()
}

impl Config {
    fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            server: ServerConfig {
                host: env_or("HOST", "0.0.0.0"),
                port: env_or("PORT", "8080").parse().unwrap_or(8080),
            },
            database: DatabaseConfig {
                path: env_or("DATABASE_PATH", "data/chute.db"),
            },
            discord: DiscordConfig {
                bot_token: env_opt("DISCORD_BOT_TOKEN"),
                channel_id: env_opt("DISCORD_CHANNEL_ID"),
                webhook_url: env_opt("DISCORD_WEBHOOK_URL"),
                api_base: env_opt("DISCORD_API_BASE"),
            },
            bucket: BucketConfig {
                endpoint: env_opt("S3_ENDPOINT"),
                bucket: env_opt("S3_BUCKET"),
                access_key_id: env_opt("S3_ACCESS_KEY_ID"),
                secret_access_key: env_opt("S3_SECRET_ACCESS_KEY"),
                region: env_or("S3_REGION", "auto"),
                public_base_url: env_opt("S3_PUBLIC_BASE_URL"),
            },
            storage: StorageConfig {
                max_upload_size: env_parse("MAX_UPLOAD_SIZE", DEFAULT_MAX_UPLOAD_SIZE),
                attachment_size_limit: env_parse(
                    "ATTACHMENT_SIZE_LIMIT",
                    DEFAULT_ATTACHMENT_LIMIT,
                ),
            },
            auth: AuthConfig {
                token: env_opt("AUTH_TOKEN"),
            },
        }
    }
}

/// Read an environment variable, treating empty values as absent.
fn env_opt(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or(key: &str, default: &str) -> String {
    env_opt(key).unwrap_or_else(|| default.to_string())
}

fn env_parse(key: &str, default: usize) -> usize {
    env_opt(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
