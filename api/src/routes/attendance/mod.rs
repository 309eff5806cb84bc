use axum::{Router, routing::post};

use crate::state::AppState;

mod common;
mod post;

pub use common::{ScanReq, ScanResponse};
pub use post::record_scan;

pub fn attendance_routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .route("/scan", post(record_scan))
        .with_state(app_state)
}
