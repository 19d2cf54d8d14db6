// src/error.rs

use std::collections::BTreeMap;
use std::sync::LazyLock;

use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use regex::Regex;
use serde_json::{Value, json};
use std::fmt;
use validator::{ValidationError, ValidationErrors};

/// `missing field `nick`` as reported by serde.
static MISSING_FIELD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"missing field `([^`]+)`").expect("missing-field regex is valid"));

/// Leading `field: ` path prepended to a deserialization error.
static FIELD_PATH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([\w.\[\]]+): ").expect("field-path regex is valid"));

/// Global Application Error Enum.
/// Centralizes error handling and mapping to HTTP responses.
#[derive(Debug)]
pub enum AppError {
    // 500 Internal Server Error
    InternalServerError(String),

    // 400 Bad Request (e.g., old password mismatch)
    BadRequest(String),

    // 401 Unauthorized
    AuthError(String),

    // 403 Forbidden
    Forbidden(String),

    // 404 Not Found
    NotFound(String),

    // 409 Conflict (e.g., user already verified)
    Conflict(String),

    // 422 Unprocessable Entity with a plain message (e.g., no-op update)
    Unprocessable(String),

    // 422 Unprocessable Entity with per-field errors
    Validation(ValidationErrors),

    // 422 Unprocessable Entity for a body field that could not be deserialized
    Malformed { field: String, message: String },
}

impl AppError {
    /// Builds a single-field validation failure.
    pub fn field(field: &'static str, code: &'static str, message: String) -> Self {
        let mut errors = ValidationErrors::new();
        errors.add(field, ValidationError::new(code).with_message(message.into()));
        AppError::Validation(errors)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unprocessable(_)
            | AppError::Validation(_)
            | AppError::Malformed { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

impl std::error::Error for AppError {}

/// Renders validator errors as `{"field": ["message", ...]}`.
pub fn field_errors(errors: &ValidationErrors) -> Value {
    let mut fields: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for (field, errs) in errors.field_errors() {
        let messages = errs
            .iter()
            .map(|e| match &e.message {
                Some(message) => message.to_string(),
                None => format!("The {} field is invalid ({}).", field, e.code),
            })
            .collect();
        fields.insert(field.to_string(), messages);
    }
    json!(fields)
}

/// Implements `IntoResponse` for `AppError`.
/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                json!("Internal Server Error")
            }
            AppError::Validation(errors) => field_errors(&errors),
            AppError::Malformed { field, message } => json!({ field: [message] }),
            AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::Unprocessable(msg) => json!(msg),
        };
        let body = Json(json!({
            "error": error,
            "code": status.as_u16(),
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        AppError::Validation(errors)
    }
}

/// Maps a data error from the JSON extractor onto the offending field.
///
/// `detail` is the deserializer message, e.g. ``missing field `nick` at line 1 column 2``
/// or ``nick: invalid type: integer `5`, expected a string``.
fn body_error(detail: &str) -> AppError {
    if let Some(captures) = MISSING_FIELD.captures(detail) {
        let field = captures[1].to_string();
        let message = format!("The {} field is required.", field);
        return AppError::Malformed { field, message };
    }
    if let Some(captures) = FIELD_PATH.captures(detail) {
        let field = captures[1].to_string();
        let message = format!("The {} field is invalid.", field);
        return AppError::Malformed { field, message };
    }
    AppError::Malformed {
        field: "body".to_string(),
        message: detail.to_string(),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(err) => {
                let detail = std::error::Error::source(&err)
                    .map(ToString::to_string)
                    .unwrap_or_else(|| err.body_text());
                body_error(&detail)
            }
            JsonRejection::JsonSyntaxError(_) => {
                AppError::BadRequest("The request body is not valid JSON.".to_string())
            }
            other => AppError::BadRequest(other.body_text()),
        }
    }
}

/// A path segment that does not parse (e.g. `/users/abc`) names no resource.
impl From<PathRejection> for AppError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Path rejected: {}", rejection.body_text());
        AppError::NotFound("Not found".to_string())
    }
}
