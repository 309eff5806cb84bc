use chrono::{DateTime, Utc};
use db::models::attendance_record;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct ScanReq {
    /// The QR payload exactly as scanned.
    #[validate(length(min = 1, message = "payload must not be empty"))]
    pub payload: String,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude is out of range"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude is out of range"))]
    pub longitude: f64,
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub session_id: i64,
    pub distance_m: Option<f64>,
    pub marked_at: DateTime<Utc>,
}

impl From<attendance_record::Model> for ScanResponse {
    fn from(record: attendance_record::Model) -> Self {
        Self {
            session_id: record.session_id,
            distance_m: record.distance_m,
            marked_at: record.marked_at,
        }
    }
}
