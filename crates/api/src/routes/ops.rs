//! Operations routes
//!
//! Service banner, health check and runtime statistics.

use axum::{Json, Router, extract::State, routing::get};
use chrono::{SecondsFormat, Utc};
use tracing::warn;

use crate::error::Result;
use crate::state::AppState;
use crate::types::{HealthResponse, ServiceInfo, StatsResponse};

/// Operations routes (banner, health, stats)
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/stats", get(stats_handler))
}

/// GET /
async fn root_handler() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        message: "tagwatch tag telemetry API",
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
    })
}

/// Health check endpoint
///
/// GET /health
///
/// Always 200 while the API is up. A store that fails a trivial query turns
/// the overall status to `degraded`.
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let database_status = match state.store.ping().await {
        Ok(()) => "healthy",
        Err(e) => {
            warn!(error = %e, "store health check failed");
            "unhealthy"
        }
    };

    Json(HealthResponse {
        status: if database_status == "healthy" {
            "healthy"
        } else {
            "degraded"
        },
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        uptime_secs: state.uptime().as_secs(),
        database_status,
        api_status: "healthy",
    })
}

/// Runtime statistics
///
/// GET /stats
async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>> {
    let store = state.store.statistics().await?;

    Ok(Json(StatsResponse {
        uptime_secs: state.uptime().as_secs(),
        store,
        parser: state.parser.stats(),
        listener: state.listener.as_ref().map(|m| m.snapshot()),
    }))
}
