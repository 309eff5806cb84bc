use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::error_response;
use crate::state::AppState;

use super::common::CourseResponse;
use services::course::CourseService;

#[derive(Serialize, Default)]
pub struct CourseListResponse {
    pub owned: Vec<CourseResponse>,
    pub enrolled: Vec<CourseResponse>,
}

/// GET /api/courses
pub async fn list_courses(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
) -> (StatusCode, Json<ApiResponse<CourseListResponse>>) {
    match CourseService::courses_for(state.db(), claims.sub).await {
        Ok((owned, enrolled)) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                CourseListResponse {
                    owned: owned.into_iter().map(CourseResponse::from).collect(),
                    enrolled: enrolled.into_iter().map(CourseResponse::from).collect(),
                },
                "Courses retrieved",
            )),
        ),
        Err(e) => error_response(e),
    }
}
