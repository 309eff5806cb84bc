use chrono::{DateTime, Utc};
use db::models::attendance_session;
use serde::{Deserialize, Serialize};
use services::qr_token::QrToken;

#[derive(Debug, Deserialize)]
pub struct ManualAttendanceReq {
    pub present_student_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
    pub active: bool,
    pub present_count: i32,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl From<attendance_session::Model> for SessionResponse {
    fn from(model: attendance_session::Model) -> Self {
        Self {
            id: model.id,
            course_id: model.course_id,
            title: model.title,
            latitude: model.latitude,
            longitude: model.longitude,
            radius_m: model.radius_m,
            active: model.active,
            present_count: model.present_count,
            started_at: model.started_at,
            ended_at: model.ended_at,
        }
    }
}

/// The scannable payload plus its expiry, for display next to the code.
#[derive(Debug, Serialize)]
pub struct QrResponse {
    pub qr_payload: String,
    pub issued_at: i64,
    pub expires_at: i64,
}

impl From<&QrToken> for QrResponse {
    fn from(token: &QrToken) -> Self {
        Self {
            qr_payload: token.to_payload(),
            issued_at: token.issued_at,
            expires_at: token.expires_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct StartSessionResponse {
    pub session: SessionResponse,
    pub qr: QrResponse,
}

impl StartSessionResponse {
    pub fn new(session: attendance_session::Model, token: &QrToken) -> Self {
        Self {
            session: SessionResponse::from(session),
            qr: QrResponse::from(token),
        }
    }
}
