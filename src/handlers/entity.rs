//! Entity handlers: create, read, list, update, delete, relation count and list, preflight.

use crate::error::{AppError, INVALID_ID_MESSAGE};
use crate::response::{self, DELETE_NOT_FOUND, NOTHING_TO_UPDATE, RELATION_EXISTS, SUCCESS};
use crate::service::CrudService;
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};

fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest(INVALID_ID_MESSAGE.into()))
}

/// Bodies are parsed as JSON whatever the Content-Type says. An empty body is an empty object.
fn body_to_map(body: &Bytes) -> Result<Map<String, Value>, AppError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    let value: Value =
        serde_json::from_slice(body).map_err(|e| AppError::BadRequest(format!("invalid JSON body: {}", e)))?;
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

pub async fn list(State(service): State<CrudService>) -> Result<impl IntoResponse, AppError> {
    let rows = service.read(None).await?;
    Ok(response::success(rows))
}

pub async fn create(State(service): State<CrudService>, body: Bytes) -> Result<impl IntoResponse, AppError> {
    let body = body_to_map(&body)?;
    let id = service.create(&body).await?;
    Ok(response::created(id))
}

pub async fn read(
    State(service): State<CrudService>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let row = service.read(Some(id)).await?;
    Ok(response::success(row))
}

pub async fn update(
    State(service): State<CrudService>,
    Path(id_str): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let body = body_to_map(&body)?;
    let outcome = service.update(id, &body).await?;
    Ok(if outcome.modified() {
        response::success(SUCCESS)
    } else if outcome.linked.is_some() {
        response::with_status(StatusCode::NOT_MODIFIED, RELATION_EXISTS)
    } else {
        response::with_status(StatusCode::NOT_MODIFIED, NOTHING_TO_UPDATE)
    })
}

pub async fn delete(
    State(service): State<CrudService>,
    Path(id_str): Path<String>,
) -> Result<Response, AppError> {
    let id = parse_id(&id_str)?;
    match service.delete(id).await {
        Ok(()) => Ok(response::success(SUCCESS).into_response()),
        Err(AppError::NotFound(_)) => {
            Ok(response::with_status(StatusCode::NOT_FOUND, DELETE_NOT_FOUND).into_response())
        }
        Err(e) => Err(e),
    }
}

pub async fn count_related(
    State(service): State<CrudService>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let count = service.count_related(id).await?;
    Ok(response::success(count))
}

pub async fn list_related(
    State(service): State<CrudService>,
    Path(id_str): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let id = parse_id(&id_str)?;
    let rows = service.list_related(id).await?;
    Ok(response::success(rows))
}

const ITEM_METHODS: &str = "GET, PUT, PATCH, DELETE, OPTIONS";
const COLLECTION_METHODS: &str = "GET, POST, OPTIONS";

fn preflight_reply(segment: &str, methods: &'static str) -> impl IntoResponse {
    (
        [
            (header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(methods)),
            (header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("*")),
        ],
        response::message(format!("{}: {}", segment, methods)),
    )
}

/// CORS preflight on an item path; no data is touched.
pub async fn preflight(State(service): State<CrudService>) -> impl IntoResponse {
    preflight_reply(&service.entity().path_segment, ITEM_METHODS)
}

/// CORS preflight on a collection path, ahead of cross-origin creates.
pub async fn preflight_collection(State(service): State<CrudService>) -> impl IntoResponse {
    preflight_reply(&service.entity().path_segment, COLLECTION_METHODS)
}
