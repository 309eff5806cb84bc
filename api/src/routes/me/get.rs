use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::error_response;
use crate::state::AppState;

use db::models::{faculty_profile, student_profile};
use services::AppError;
use services::profile::ProfileService;
use services::reporting::{ReportingService, StudentDashboard};

/// GET /api/me/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> (StatusCode, Json<ApiResponse<Option<StudentDashboard>>>) {
    match ReportingService::student_dashboard(state.db(), claims.sub, Utc::now()).await {
        Ok(dashboard) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(dashboard),
                "Dashboard retrieved",
            )),
        ),
        Err(e) => error_response(e),
    }
}

/// GET /api/me/student-profile
pub async fn get_student_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> (StatusCode, Json<ApiResponse<Option<student_profile::Model>>>) {
    match ProfileService::get_student(state.db(), claims.sub).await {
        Ok(Some(profile)) => (
            StatusCode::OK,
            Json(ApiResponse::success(Some(profile), "Profile retrieved")),
        ),
        Ok(None) => error_response(AppError::NotFound("profile")),
        Err(e) => error_response(e),
    }
}

/// GET /api/me/faculty-profile
pub async fn get_faculty_profile(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> (StatusCode, Json<ApiResponse<Option<faculty_profile::Model>>>) {
    match ProfileService::get_faculty(state.db(), claims.sub).await {
        Ok(Some(profile)) => (
            StatusCode::OK,
            Json(ApiResponse::success(Some(profile), "Profile retrieved")),
        ),
        Ok(None) => error_response(AppError::NotFound("profile")),
        Err(e) => error_response(e),
    }
}
