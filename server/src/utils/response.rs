use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// Envelope shared by every endpoint: `{status, message, data?, meta?}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T, M = ()>
where
    T: Serialize,
    M: Serialize,
{
    pub status: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<M>,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct PageMeta {
    pub page: i64,
    pub size: i64,
    pub total: i64,
}

fn envelope<T, M>(
    status: StatusCode,
    code: &str,
    message: impl Into<String>,
    data: Option<T>,
    meta: Option<M>,
) -> Response
where
    T: Serialize,
    M: Serialize,
{
    let body = ApiResponse {
        status: code.to_string(),
        message: message.into(),
        data,
        meta,
    };
    (status, Json(body)).into_response()
}

pub fn success<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    envelope::<T, ()>(StatusCode::OK, "OK", message, Some(data), None)
}

pub fn created<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    envelope::<T, ()>(StatusCode::CREATED, "CREATED", message, Some(data), None)
}

pub fn paginated<T>(data: T, meta: PageMeta, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    envelope(StatusCode::OK, "OK", message, Some(data), Some(meta))
}

pub fn empty_success(message: impl Into<String>) -> Response {
    envelope::<(), ()>(StatusCode::OK, "OK", message, None, None)
}

pub fn error(code: &str, message: impl Into<String>, status: StatusCode) -> Response {
    envelope::<(), ()>(status, code, message, None, None)
}
