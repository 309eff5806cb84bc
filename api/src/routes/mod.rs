use axum::{Router, routing::get};

use crate::state::AppState;

pub mod attendance;
pub mod common;
pub mod courses;
pub mod health;
pub mod me;
pub mod sessions;

pub fn routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .nest("/courses", courses::course_routes(app_state.clone()))
        .nest("/sessions", sessions::session_routes(app_state.clone()))
        .nest(
            "/attendance",
            attendance::attendance_routes(app_state.clone()),
        )
        .nest("/me", me::me_routes(app_state))
}
