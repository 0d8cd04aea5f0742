//! Beacon submission over HTTP
//!
//! Same parse and ingest path as the TCP listener, one line per request.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    routing::post,
};
use tracing::debug;

use crate::error::Result;
use crate::state::AppState;
use crate::types::{SubmitDataRequest, SubmitDataResponse};

pub fn routes() -> Router<AppState> {
    Router::new().route("/data", post(submit_data))
}

/// POST /data
///
/// 400 when the parser rejects the line. Beacons for unregistered tags are
/// accepted and dropped, like on the wire.
async fn submit_data(
    State(state): State<AppState>,
    req: std::result::Result<Json<SubmitDataRequest>, JsonRejection>,
) -> Result<Json<SubmitDataResponse>> {
    let Json(req) = req?;
    let beacon = state.parser.parse(&req.raw_data)?;

    let outcome = state
        .store
        .ingest_outcome(&beacon.tag_id, beacon.cnt, &beacon.timestamp)
        .await?;
    let cnt_changed = outcome.changed();

    let message = if !outcome.is_registered() {
        debug!(tag_id = %beacon.tag_id, "beacon for unregistered tag submitted via api");
        "Tag not registered, beacon ignored"
    } else if cnt_changed {
        "Tag data processed, counter changed"
    } else {
        "Tag data processed, counter unchanged"
    };

    Ok(Json(SubmitDataResponse {
        success: true,
        message: message.into(),
        tag_id: beacon.tag_id,
        cnt: beacon.cnt,
        cnt_changed,
    }))
}
