//! Root greeting plus liveness, readiness and version probes.

use crate::response;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct Probe {
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    store: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    entities: Option<usize>,
}

#[derive(Serialize)]
struct VersionBody {
    name: &'static str,
    version: &'static str,
    entities: Vec<String>,
}

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");

async fn root() -> Json<response::MessageBody> {
    response::message("hello bookstore!")
}

async fn health() -> Json<Probe> {
    Json(Probe {
        status: "ok",
        store: None,
        entities: None,
    })
}

/// 503 until the store answers a ping.
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<Probe>) {
    let entities = Some(state.model.entities.len());
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(Probe {
                status: "ok",
                store: Some("ok"),
                entities,
            }),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "store not ready");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(Probe {
                    status: "degraded",
                    store: Some("unavailable"),
                    entities,
                }),
            )
        }
    }
}

async fn version(State(state): State<AppState>) -> Json<VersionBody> {
    Json(VersionBody {
        name: NAME,
        version: VERSION,
        entities: state.model.entities.iter().map(|e| e.path_segment.clone()).collect(),
    })
}

/// Probes bound to a running model: /ready checks the store, /version lists entity paths.
pub fn common_routes_with_ready(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}
