use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use validator::Validate;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::{error_response, format_validation_errors};
use crate::routes::sessions::StartSessionResponse;
use crate::state::AppState;

use super::common::{CourseResponse, CreateCourseReq, EnrollReq, JoinCourseReq, StartSessionReq};
use services::course::{CourseService, CreateCourse};
use services::session::{SessionService, StartSession};

/// POST /api/courses
pub async fn create_course(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(body): Json<CreateCourseReq>,
) -> (StatusCode, Json<ApiResponse<Option<CourseResponse>>>) {
    if let Err(errors) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(&errors))),
        );
    }

    let params = CreateCourse {
        code: body.code,
        name: body.name,
        department: body.department,
        academic_year: body.academic_year,
    };

    match CourseService::create(state.db(), claims.sub, params, Utc::now()).await {
        Ok(course) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                Some(CourseResponse::from(course)),
                "Course created",
            )),
        ),
        Err(e) => error_response(e),
    }
}

/// POST /api/courses/join
pub async fn join_course(
    State(state): State<AppState>,
    AuthUser(claims): AuthUser,
    Json(body): Json<JoinCourseReq>,
) -> (StatusCode, Json<ApiResponse<Option<CourseResponse>>>) {
    match CourseService::join_by_code(state.db(), claims.sub, &body.code, Utc::now()).await {
        Ok((course, _)) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(CourseResponse::from(course)),
                "Enrolled in course",
            )),
        ),
        Err(e) => error_response(e),
    }
}

/// POST /api/courses/{course_id}/enrollments
pub async fn enroll_student(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    AuthUser(claims): AuthUser,
    Json(body): Json<EnrollReq>,
) -> (StatusCode, Json<ApiResponse<()>>) {
    match CourseService::enroll_student(
        state.db(),
        claims.sub,
        course_id,
        body.student_id,
        Utc::now(),
    )
    .await
    {
        Ok(_) => (
            StatusCode::CREATED,
            Json(ApiResponse::success((), "Student enrolled")),
        ),
        Err(e) => error_response(e),
    }
}

/// POST /api/courses/{course_id}/sessions
pub async fn start_session(
    State(state): State<AppState>,
    Path(course_id): Path<i64>,
    AuthUser(claims): AuthUser,
    Json(body): Json<StartSessionReq>,
) -> (StatusCode, Json<ApiResponse<Option<StartSessionResponse>>>) {
    if let Err(errors) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(format_validation_errors(&errors))),
        );
    }

    let params = StartSession {
        title: body.title,
        latitude: body.latitude,
        longitude: body.longitude,
        radius_m: body.radius_m,
        validity_seconds: body.validity_seconds,
    };

    match SessionService::start(
        state.db(),
        state.signer(),
        claims.sub,
        course_id,
        params,
        Utc::now(),
    )
    .await
    {
        Ok((session, token)) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                Some(StartSessionResponse::new(session, &token)),
                "Attendance session started",
            )),
        ),
        Err(e) => error_response(e),
    }
}
