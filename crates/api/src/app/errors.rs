use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use spendwise_auth::AuthCause;

use crate::app::services::StoreError;

pub fn json_error(status: StatusCode, message: impl Into<String>) -> axum::response::Response {
    (status, axum::Json(json!({ "error": message.into() }))).into_response()
}

/// 401 carrying the verification cause.
pub fn unauthorized(cause: &AuthCause) -> axum::response::Response {
    json_error(StatusCode::UNAUTHORIZED, cause.to_string())
}

pub fn bad_request(message: impl Into<String>) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, message)
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::AlreadyExists(_)
        | StoreError::DoesNotExist(_)
        | StoreError::NotFound(_)
        | StoreError::NoValidEmails
        | StoreError::WouldEmptyGroup => bad_request(err.to_string()),
    }
}
