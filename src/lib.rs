//! Chute - Discord-backed file hosting proxy
//!
//! Stores uploaded files as Discord message attachments (bot token or
//! webhook credential path, with automatic failover between them) or in
//! an S3-compatible bucket, with per-file metadata in a SQLite index.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;

pub use config::config;
pub use error::{Error, Result};
pub use state::AppState;
