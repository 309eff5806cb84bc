use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::error_response;
use crate::state::AppState;

use super::common::ManualAttendanceReq;
use services::attendance::{AttendanceService, ManualOutcome};

/// PUT /api/sessions/{session_id}/attendance
///
/// Set-reconciliation of the present roster: only the delta between the
/// submitted ids and the current present set is written.
pub async fn apply_manual_attendance(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    AuthUser(claims): AuthUser,
    Json(body): Json<ManualAttendanceReq>,
) -> (StatusCode, Json<ApiResponse<Option<ManualOutcome>>>) {
    match AttendanceService::apply_manual(
        state.db(),
        claims.sub,
        session_id,
        &body.present_student_ids,
        Utc::now(),
    )
    .await
    {
        Ok(outcome) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(outcome),
                "Manual attendance applied",
            )),
        ),
        Err(e) => error_response(e),
    }
}
