//! Integration tests for registration and read endpoints

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

use tagwatch_api::{AppState, build_router};
use tagwatch_protocol::BeaconParser;
use tagwatch_store::TagStore;

async fn test_app() -> (Router, Arc<TagStore>) {
    let store = Arc::new(TagStore::new_memory().await.unwrap());
    let state = AppState::new(store.clone(), Arc::new(BeaconParser::strict()));
    (build_router(state), store)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_register_tag() {
    let (app, store) = test_app().await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/tags",
            json!({"id": "fa451f0755d8", "description": "Helmet Tag for worker A"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["tag_id"], "fa451f0755d8");

    assert!(store.is_registered("fa451f0755d8").await.unwrap());
}

#[tokio::test]
async fn test_register_duplicate_conflicts() {
    let (app, store) = test_app().await;
    store.register("fa451f0755d8", "original").await.unwrap();

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/tags",
            json!({"id": "fa451f0755d8", "description": "replacement"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let body = body_json(response).await;
    assert_eq!(body["error"], "CONFLICT");

    let reg = store.get_registration("fa451f0755d8").await.unwrap().unwrap();
    assert_eq!(reg.description, "original");
}

#[tokio::test]
async fn test_register_empty_id_rejected() {
    let (app, _store) = test_app().await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/tags",
            json!({"id": "  ", "description": "blank"}),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_register_missing_id_rejected() {
    let (app, _store) = test_app().await;

    let response = app
        .oneshot(json_request(
            Method::POST,
            "/tags",
            json!({"description": "no id"}),
        ))
        .await
        .unwrap();

    assert!(response.status().is_client_error());
}

#[tokio::test]
async fn test_list_tags() {
    let (app, store) = test_app().await;
    store.register("fa451f0755d8", "Helmet").await.unwrap();
    store.register("ab123c4567ef", "Vest").await.unwrap();
    store
        .ingest("ab123c4567ef", 5, "20251003140059.456")
        .await
        .unwrap();

    let response = app.oneshot(get("/tags")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total_count"], 2);

    let tags = body["tags"].as_array().unwrap();
    let vest = tags.iter().find(|t| t["id"] == "ab123c4567ef").unwrap();
    assert_eq!(vest["status"], "active");
    assert_eq!(vest["last_cnt"], 5);
    assert_eq!(vest["last_seen"], "20251003140059.456");

    let helmet = tags.iter().find(|t| t["id"] == "fa451f0755d8").unwrap();
    assert_eq!(helmet["status"], "registered");
    assert!(helmet["last_cnt"].is_null());
}

#[tokio::test]
async fn test_list_tags_empty() {
    let (app, _store) = test_app().await;

    let response = app.oneshot(get("/tags")).await.unwrap();
    let body = body_json(response).await;
    assert_eq!(body["total_count"], 0);
    assert!(body["tags"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_get_tag() {
    let (app, store) = test_app().await;
    store.register("fa451f0755d8", "Helmet").await.unwrap();

    let response = app.clone().oneshot(get("/tag/fa451f0755d8")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], "fa451f0755d8");
    assert_eq!(body["description"], "Helmet");
    assert_eq!(body["status"], "registered");
    assert_eq!(body["total_updates"], 0);

    let response = app.oneshot(get("/tag/0000000000")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_history_newest_first_with_limit() {
    let (app, store) = test_app().await;
    store.register("fa451f0755d8", "Helmet").await.unwrap();
    for cnt in 1..=5 {
        store
            .ingest("fa451f0755d8", cnt, "20251003140059.456")
            .await
            .unwrap();
    }

    let response = app
        .clone()
        .oneshot(get("/tag/fa451f0755d8/history"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 5);
    assert_eq!(body["records"][0]["cnt"], 5);
    assert_eq!(body["records"][4]["cnt"], 1);

    let response = app
        .clone()
        .oneshot(get("/tag/fa451f0755d8/history?limit=2"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["count"], 2);
    assert_eq!(body["records"][0]["cnt"], 5);
    assert_eq!(body["records"][1]["cnt"], 4);

    let response = app
        .oneshot(get("/tag/fa451f0755d8/history?limit=0"))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn test_history_unregistered_not_found() {
    let (app, _store) = test_app().await;

    let response = app
        .oneshot(get("/tag/fa451f0755d8/history"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_history_bad_limit_rejected() {
    let (app, store) = test_app().await;
    store.register("fa451f0755d8", "Helmet").await.unwrap();

    let response = app
        .oneshot(get("/tag/fa451f0755d8/history?limit=lots"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "BAD_REQUEST");
    assert!(body["message"].as_str().unwrap().contains("query string"));
}

#[tokio::test]
async fn test_register_unreadable_body() {
    let (app, store) = test_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/tags")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["error"], "BAD_REQUEST");
    assert_eq!(store.statistics().await.unwrap().registered_tags, 0);
}
