use axum::{
    Router,
    routing::{get, put},
};

use crate::state::AppState;

mod get;
mod put;

pub use get::{dashboard, get_faculty_profile, get_student_profile};
pub use put::{update_faculty_profile, update_student_profile};

pub fn me_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/student-profile", get(get_student_profile))
        .route("/student-profile", put(update_student_profile))
        .route("/faculty-profile", get(get_faculty_profile))
        .route("/faculty-profile", put(update_faculty_profile))
        .with_state(app_state)
}
