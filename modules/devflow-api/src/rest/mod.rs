pub mod ai;
pub mod answers;
pub mod collections;
pub mod questions;
pub mod tags;
pub mod users;
pub mod votes;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

use devflow_common::{ActionResponse, ErrorKind};

/// Send an action result with the status its outcome calls for.
pub(crate) fn reply<T: Serialize>(resp: ActionResponse<T>, success: StatusCode) -> Response {
    let status = match resp.error_kind() {
        None => success,
        Some(ErrorKind::Validation) => StatusCode::BAD_REQUEST,
        Some(ErrorKind::Unauthorized) => StatusCode::UNAUTHORIZED,
        Some(ErrorKind::NotFound) => StatusCode::NOT_FOUND,
        Some(ErrorKind::Internal) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(resp)).into_response()
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
