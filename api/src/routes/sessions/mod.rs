use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

mod common;
mod get;
mod post;
mod put;

pub use common::{ManualAttendanceReq, QrResponse, SessionResponse, StartSessionResponse};
pub use get::{live_roster, session_roster};
pub use post::{reissue_qr, stop_session};
pub use put::apply_manual_attendance;

pub fn session_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/{session_id}/stop", post(stop_session))
        .route("/{session_id}/qr", post(reissue_qr))
        .route("/{session_id}/attendance", put(apply_manual_attendance))
        .route("/{session_id}/attendance", get(live_roster))
        .route("/{session_id}/roster", get(session_roster))
        .with_state(app_state)
}
