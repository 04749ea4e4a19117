//! Plain-text HTTP response helpers. The admin surface's wire format is
//! fixed as plain newline-terminated text bodies rather than a JSON
//! envelope, so every response here is built from a literal string.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

pub fn plain(status: StatusCode, body: impl Into<String>) -> Response {
    let mut text = body.into();
    if !text.ends_with('\n') {
        text.push('\n');
    }
    (status, text).into_response()
}

pub fn created(body: &str) -> Response {
    plain(StatusCode::CREATED, body)
}

pub fn ok(body: &str) -> Response {
    plain(StatusCode::OK, body)
}

pub fn bad_request(message: impl Into<String>) -> Response {
    plain(StatusCode::BAD_REQUEST, message.into())
}

pub fn conflict(message: impl Into<String>) -> Response {
    plain(StatusCode::CONFLICT, message.into())
}

pub fn not_found(message: impl Into<String>) -> Response {
    plain(StatusCode::NOT_FOUND, message.into())
}

pub fn unauthorized(message: impl Into<String>) -> Response {
    plain(StatusCode::UNAUTHORIZED, message.into())
}

pub fn method_not_allowed() -> Response {
    plain(StatusCode::METHOD_NOT_ALLOWED, "Method Not Allowed")
}

pub fn internal_error(message: impl Into<String>) -> Response {
    plain(StatusCode::INTERNAL_SERVER_ERROR, message.into())
}
