use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::error_response;
use crate::state::AppState;

use services::reporting::{LiveRosterEntry, ReportingService, RosterEntry};

/// GET /api/sessions/{session_id}/attendance
pub async fn live_roster(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    AuthUser(claims): AuthUser,
) -> (StatusCode, Json<ApiResponse<Vec<LiveRosterEntry>>>) {
    match ReportingService::live_roster(state.db(), claims.sub, session_id).await {
        Ok(roster) => (
            StatusCode::OK,
            Json(ApiResponse::success(roster, "Live roster retrieved")),
        ),
        Err(e) => error_response(e),
    }
}

/// GET /api/sessions/{session_id}/roster
pub async fn session_roster(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    AuthUser(claims): AuthUser,
) -> (StatusCode, Json<ApiResponse<Vec<RosterEntry>>>) {
    match ReportingService::session_roster(state.db(), claims.sub, session_id).await {
        Ok(roster) => (
            StatusCode::OK,
            Json(ApiResponse::success(roster, "Session roster retrieved")),
        ),
        Err(e) => error_response(e),
    }
}
