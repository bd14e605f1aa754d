#![allow(dead_code)]

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode},
    Router,
};
use bookstore::{app, bootstrap, resolve, AppState, CrudService, FullConfig, MemoryStore, Seed};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt; // for `oneshot`

/// State over a fresh in-memory store reset to the bookstore seed.
pub async fn seeded_state() -> AppState {
    let model = resolve(&FullConfig::bookstore().unwrap()).unwrap();
    let store = Arc::new(MemoryStore::new());
    bootstrap(store.as_ref(), &model, &Seed::bookstore().unwrap())
        .await
        .unwrap();
    AppState::new(store, model)
}

pub async fn seeded_app() -> Router {
    app(seeded_state().await, 64 * 1024)
}

pub fn service(state: &AppState, path_segment: &str) -> CrudService {
    state
        .services()
        .into_iter()
        .find(|s| s.entity().path_segment == path_segment)
        .unwrap()
}

pub struct Reply {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub json: Value,
}

/// Send one request. Bodies go out without a Content-Type, as plain clients do.
pub async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> Reply {
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .header("origin", "http://example.test")
        .body(body)
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    Reply { status, headers, json }
}

pub async fn get(app: &Router, uri: &str) -> Reply {
    send(app, Method::GET, uri, None).await
}

/// Ids of a `{"result": [{"id": ..}, ..]}` reply, sorted.
pub fn result_ids(reply: &Reply) -> Vec<i64> {
    let mut ids: Vec<i64> = reply.json["result"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_i64().unwrap())
        .collect();
    ids.sort_unstable();
    ids
}
