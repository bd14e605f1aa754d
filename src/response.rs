//! Response envelope helpers: `{"result": ...}`, `{"id": ...}` and `{"message": ...}`.

use axum::{http::StatusCode, Json};
use serde::Serialize;

pub const SUCCESS: &str = "Success";
pub const RELATION_EXISTS: &str = "Relation already exists.";
pub const NOTHING_TO_UPDATE: &str = "Nothing to update.";
pub const DELETE_NOT_FOUND: &str = "No matching record found.";

#[derive(Serialize)]
pub struct ResultBody<T> {
    pub result: T,
}

#[derive(Serialize)]
pub struct CreatedBody {
    pub id: i64,
}

#[derive(Serialize)]
pub struct MessageBody {
    pub message: String,
}

pub fn success<T: Serialize>(result: T) -> (StatusCode, Json<ResultBody<T>>) {
    with_status(StatusCode::OK, result)
}

pub fn with_status<T: Serialize>(status: StatusCode, result: T) -> (StatusCode, Json<ResultBody<T>>) {
    (status, Json(ResultBody { result }))
}

pub fn created(id: i64) -> (StatusCode, Json<CreatedBody>) {
    (StatusCode::CREATED, Json(CreatedBody { id }))
}

pub fn message(text: impl Into<String>) -> Json<MessageBody> {
    Json(MessageBody { message: text.into() })
}
