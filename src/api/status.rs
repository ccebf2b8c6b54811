//! Status Routes
//!
//! Health checks and the composite backend connectivity report.
//!
//! Routes:
//! - GET /health - Basic health check
//! - GET /status - Backend connectivity and database status

use axum::{extract::State, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::services::ConnectionStatus;
use crate::{AppState, Result};

/// Build status routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(system_status))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// System status response.
#[derive(Debug, Serialize)]
pub struct SystemStatusResponse {
    pub status: HealthStatus,
    pub version: String,
    pub database: DatabaseStatus,
    /// Merged report across the configured Discord paths.
    pub connection: ConnectionStatus,
    pub files: i64,
}

#[derive(Debug, Serialize)]
pub struct DatabaseStatus {
    pub connected: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Basic health check.
///
/// GET /health
///
/// Returns 200 if the server is running. Used by load balancers
/// for basic availability checking.
#[axum::debug_handler]
async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").into(),
        timestamp: Utc::now(),
    })
}

/// Detailed system status.
///
/// GET /status
///
/// Probes every configured Discord path (no short-circuit) and checks
/// the metadata index.
#[axum::debug_handler]
async fn system_status(State(state): State<AppState>) -> Result<Json<SystemStatusResponse>> {
    let db_connected = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();

    let connection = state.storage.check_connection().await;

    let files = if db_connected {
        crate::db::count_file_records(&state.db).await.unwrap_or(0)
    } else {
        0
    };

    let status = if db_connected && connection.connected {
        HealthStatus::Healthy
    } else if db_connected || connection.connected {
        HealthStatus::Degraded
    } else {
        HealthStatus::Unhealthy
    };

    Ok(Json(SystemStatusResponse {
        status,
        version: env!("CARGO_PKG_VERSION").into(),
        database: DatabaseStatus {
            connected: db_connected,
        },
        connection,
        files,
    }))
}
