use axum::{Json, http::StatusCode};

use crate::response::ApiResponse;

pub async fn health() -> (StatusCode, Json<ApiResponse<()>>) {
    (
        StatusCode::OK,
        Json(ApiResponse::success((), "Service is healthy")),
    )
}
