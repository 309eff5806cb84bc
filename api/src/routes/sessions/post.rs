use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Utc;
use serde::Deserialize;

use crate::auth::AuthUser;
use crate::response::ApiResponse;
use crate::routes::common::error_response;
use crate::state::AppState;

use super::common::{QrResponse, SessionResponse};
use services::session::SessionService;

/// POST /api/sessions/{session_id}/stop
pub async fn stop_session(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    AuthUser(claims): AuthUser,
) -> (StatusCode, Json<ApiResponse<Option<SessionResponse>>>) {
    match SessionService::stop(state.db(), claims.sub, session_id, Utc::now()).await {
        Ok(session) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(SessionResponse::from(session)),
                "Attendance session stopped",
            )),
        ),
        Err(e) => error_response(e),
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ReissueQrReq {
    pub validity_seconds: Option<i64>,
}

/// POST /api/sessions/{session_id}/qr
///
/// Replaces the session's active QR token; previously issued payloads stop
/// being accepted as soon as this returns.
pub async fn reissue_qr(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    AuthUser(claims): AuthUser,
    body: Option<Json<ReissueQrReq>>,
) -> (StatusCode, Json<ApiResponse<Option<QrResponse>>>) {
    let validity_seconds = body.and_then(|Json(b)| b.validity_seconds);

    match SessionService::reissue_qr(
        state.db(),
        state.signer(),
        claims.sub,
        session_id,
        validity_seconds,
        Utc::now(),
    )
    .await
    {
        Ok(token) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(QrResponse::from(&token)),
                "QR code reissued",
            )),
        ),
        Err(e) => error_response(e),
    }
}
