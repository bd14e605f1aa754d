//! Typed errors and HTTP mapping.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// SQLSTATE for foreign_key_violation.
const FOREIGN_KEY_VIOLATION: &str = "23503";
/// SQLSTATE for string_data_right_truncation.
const STRING_TOO_LONG: &str = "22001";
/// SQLSTATE for not_null_violation.
const NOT_NULL_VIOLATION: &str = "23502";

pub const NOT_FOUND_MESSAGE: &str = "No matching record was found.";
pub const INVALID_ID_MESSAGE: &str = "Invalid ID supplied.";
const INTERNAL_MESSAGE: &str = "Internal server error.";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing reference: {kind} id '{id}'")]
    MissingReference { kind: &'static str, id: String },
    #[error("duplicate path segment: {0}")]
    DuplicatePathSegment(String),
    #[error("invalid identifier for {kind}: '{value}'")]
    InvalidIdentifier { kind: &'static str, value: String },
    #[error("config load: {0}")]
    Load(String),
    #[error("validation: {0}")]
    Validation(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    /// A relation references a row that does not exist.
    #[error("referential: {0}")]
    Referential(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("internal: {0}")]
    Internal(String),
    #[error("database: {0}")]
    Db(sqlx::Error),
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::RowNotFound = e {
            return AppError::NotFound("row".into());
        }
        if let sqlx::Error::Database(ref db) = e {
            match db.code().as_deref() {
                Some(FOREIGN_KEY_VIOLATION) => {
                    return AppError::Referential(db.message().to_string());
                }
                Some(STRING_TOO_LONG) => {
                    return AppError::Validation("value too long for column".into());
                }
                Some(NOT_NULL_VIOLATION) => {
                    return AppError::Validation("value must not be null".into());
                }
                _ => {}
            }
        }
        AppError::Db(e)
    }
}

#[derive(Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) | AppError::Referential(_) | AppError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            AppError::Config(_) | AppError::Internal(_) | AppError::Db(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the client. Store and config details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            AppError::NotFound(_) => NOT_FOUND_MESSAGE.to_string(),
            AppError::Referential(_) => INVALID_ID_MESSAGE.to_string(),
            AppError::Validation(m) | AppError::BadRequest(m) => m.clone(),
            AppError::Config(_) | AppError::Internal(_) | AppError::Db(_) => INTERNAL_MESSAGE.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = ErrorBody {
            error: self.public_message(),
        };
        (status, Json(body)).into_response()
    }
}
