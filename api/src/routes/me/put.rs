use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::error_response;
use crate::state::AppState;

use db::models::{faculty_profile, student_profile};
use services::profile::{ProfileService, UpdateFacultyProfile, UpdateStudentProfile};

/// PUT /api/me/student-profile
///
/// Merge semantics: fields omitted from the body keep their stored values.
pub async fn update_student_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(body): Json<UpdateStudentProfile>,
) -> (StatusCode, Json<ApiResponse<Option<student_profile::Model>>>) {
    match ProfileService::upsert_student(state.db(), claims.sub, body, Utc::now()).await {
        Ok(profile) => (
            StatusCode::OK,
            Json(ApiResponse::success(Some(profile), "Profile saved")),
        ),
        Err(e) => error_response(e),
    }
}

/// PUT /api/me/faculty-profile
pub async fn update_faculty_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(body): Json<UpdateFacultyProfile>,
) -> (StatusCode, Json<ApiResponse<Option<faculty_profile::Model>>>) {
    match ProfileService::upsert_faculty(state.db(), claims.sub, body, Utc::now()).await {
        Ok(profile) => (
            StatusCode::OK,
            Json(ApiResponse::success(Some(profile), "Profile saved")),
        ),
        Err(e) => error_response(e),
    }
}
