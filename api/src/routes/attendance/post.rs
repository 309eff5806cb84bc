use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use validator::Validate;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::{error_response, format_validation_errors};
use crate::state::AppState;

use super::common::{ScanReq, ScanResponse};
use services::attendance::AttendanceService;

/// POST /api/attendance/scan
pub async fn record_scan(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(body): Json<ScanReq>,
) -> (StatusCode, Json<ApiResponse<Option<ScanResponse>>>) {
    if let Err(errors) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(&errors))),
        );
    }

    match AttendanceService::record_scan(
        state.db(),
        state.signer(),
        claims.sub,
        &body.payload,
        body.latitude,
        body.longitude,
        Utc::now(),
    )
    .await
    {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(ScanResponse::from(record)),
                "Attendance recorded",
            )),
        ),
        Err(e) => error_response(e),
    }
}
