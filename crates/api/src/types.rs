//! API request and response types

use serde::{Deserialize, Serialize};
use tagwatch_protocol::ParserStats;
use tagwatch_sources::ListenerMetricsSnapshot;
use tagwatch_store::{HistoryRecord, StoreStats, TagView};

/// Default number of history records returned
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// Largest history page a client may request
pub const MAX_HISTORY_LIMIT: usize = 1000;

/// `GET /` response
#[derive(Debug, Serialize)]
pub struct ServiceInfo {
    pub message: &'static str,
    pub version: &'static str,
    pub status: &'static str,
}

/// `GET /health` response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `healthy` or `degraded`
    pub status: &'static str,
    /// RFC 3339 time of the check
    pub timestamp: String,
    pub uptime_secs: u64,
    /// `healthy` or `unhealthy`
    pub database_status: &'static str,
    pub api_status: &'static str,
}

/// `GET /stats` response
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub uptime_secs: u64,
    pub store: StoreStats,
    pub parser: ParserStats,
    /// Present only when the listener runs in-process
    #[serde(skip_serializing_if = "Option::is_none")]
    pub listener: Option<ListenerMetricsSnapshot>,
}

/// `POST /tags` request body
#[derive(Debug, Deserialize)]
pub struct RegisterTagRequest {
    pub id: String,
    #[serde(default)]
    pub description: String,
}

/// `POST /tags` response
#[derive(Debug, Serialize)]
pub struct RegisterTagResponse {
    pub success: bool,
    pub message: String,
    pub tag_id: String,
}

/// `GET /tags` response
#[derive(Debug, Serialize)]
pub struct TagListResponse {
    pub tags: Vec<TagView>,
    pub total_count: usize,
}

/// Query parameters for `GET /tag/{id}/history`
#[derive(Debug, Deserialize)]
pub struct HistoryParams {
    /// Number of records, newest first
    #[serde(default = "default_history_limit")]
    pub limit: usize,
}

fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}

impl HistoryParams {
    /// Requested limit capped at [`MAX_HISTORY_LIMIT`]
    pub fn effective_limit(&self) -> usize {
        self.limit.min(MAX_HISTORY_LIMIT)
    }
}

/// `GET /tag/{id}/history` response
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub tag_id: String,
    pub records: Vec<HistoryRecord>,
    pub count: usize,
}

/// `POST /data` request body
#[derive(Debug, Deserialize)]
pub struct SubmitDataRequest {
    /// One beacon line, e.g. `TAG,fa451f0755d8,197,20251003140059.456`
    pub raw_data: String,
}

/// `POST /data` response
#[derive(Debug, Serialize)]
pub struct SubmitDataResponse {
    pub success: bool,
    pub message: String,
    pub tag_id: String,
    pub cnt: u64,
    pub cnt_changed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_limit_capped() {
        let params = HistoryParams { limit: 5000 };
        assert_eq!(params.effective_limit(), MAX_HISTORY_LIMIT);

        let params = HistoryParams { limit: 7 };
        assert_eq!(params.effective_limit(), 7);
    }

    #[test]
    fn test_register_request_description_optional() {
        let req: RegisterTagRequest = serde_json::from_str(r#"{"id":"fa451f0755d8"}"#).unwrap();
        assert_eq!(req.id, "fa451f0755d8");
        assert!(req.description.is_empty());
    }
}
