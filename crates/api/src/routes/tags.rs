//! Tag registration and read routes

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    routing::get,
};
use tagwatch_store::TagView;
use tracing::info;

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::{
    HistoryParams, HistoryResponse, RegisterTagRequest, RegisterTagResponse, TagListResponse,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tags", get(list_tags).post(register_tag))
        .route("/tag/{id}", get(get_tag))
        .route("/tag/{id}/history", get(get_history))
}

/// POST /tags
async fn register_tag(
    State(state): State<AppState>,
    req: std::result::Result<Json<RegisterTagRequest>, JsonRejection>,
) -> Result<Json<RegisterTagResponse>> {
    let Json(req) = req?;
    let id = req.id.trim();
    if id.is_empty() {
        return Err(ApiError::validation("id", "tag id must not be empty"));
    }

    if !state.store.register(id, &req.description).await? {
        return Err(ApiError::conflict("tag", id));
    }

    info!(tag_id = %id, "tag registered via api");
    Ok(Json(RegisterTagResponse {
        success: true,
        message: "Tag registered successfully".into(),
        tag_id: id.to_string(),
    }))
}

/// GET /tags
async fn list_tags(State(state): State<AppState>) -> Result<Json<TagListResponse>> {
    let tags = state.store.get_registered_tags().await?;
    let total_count = tags.len();
    Ok(Json(TagListResponse { tags, total_count }))
}

/// GET /tag/{id}
async fn get_tag(State(state): State<AppState>, Path(id): Path<String>) -> Result<Json<TagView>> {
    state
        .store
        .get_status(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("tag", &id))
}

/// GET /tag/{id}/history?limit=N
async fn get_history(
    State(state): State<AppState>,
    Path(id): Path<String>,
    params: std::result::Result<Query<HistoryParams>, QueryRejection>,
) -> Result<Json<HistoryResponse>> {
    let Query(params) = params?;
    if !state.store.is_registered(&id).await? {
        return Err(ApiError::not_found("tag", &id));
    }

    let records = state
        .store
        .get_history(&id, params.effective_limit())
        .await?;
    let count = records.len();

    Ok(Json(HistoryResponse {
        tag_id: id,
        records,
        count,
    }))
}
