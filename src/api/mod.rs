//! API Routes for Chute
//!
//! This module combines all API routes into a single router.
//!
//! Route structure:
//! - /api/files/* - File hosting (mutations token-protected when configured)
//! - /health, /status - Health checks (public)

mod files;
pub mod status;

use axum::Router;

use crate::AppState;

/// Build the complete API router.
pub fn routes() -> Router<AppState> {
    Router::new()
        // Health and status endpoints (public)
        .merge(status::routes())
        // File hosting
        .nest("/api/files", files::routes())
}
