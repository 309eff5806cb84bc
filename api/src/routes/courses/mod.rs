use axum::{
    Router,
    routing::{delete, get, post},
};

use crate::state::AppState;

mod common;
mod delete;
mod get;
mod post;

pub use common::{CourseResponse, CreateCourseReq, EnrollReq, JoinCourseReq, StartSessionReq};
pub use delete::drop_student;
pub use get::list_courses;
pub use post::{create_course, enroll_student, join_course, start_session};

pub fn course_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/", post(create_course))
        .route("/", get(list_courses))
        .route("/join", post(join_course))
        .route("/{course_id}/enrollments", post(enroll_student))
        .route(
            "/{course_id}/enrollments/{student_id}",
            delete(drop_student),
        )
        .route("/{course_id}/sessions", post(start_session))
        .with_state(app_state)
}
