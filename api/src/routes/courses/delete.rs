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

use services::course::CourseService;

/// DELETE /api/courses/{course_id}/enrollments/{student_id}
pub async fn drop_student(
    State(state): State<AppState>,
    Path((course_id, student_id)): Path<(i64, i64)>,
    AuthUser(claims): AuthUser,
) -> (StatusCode, Json<ApiResponse<()>>) {
    match CourseService::drop_student(state.db(), claims.sub, course_id, student_id, Utc::now())
        .await
    {
        Ok(()) => (
            StatusCode::OK,
            Json(ApiResponse::success((), "Student dropped from course")),
        ),
        Err(e) => error_response(e),
    }
}
