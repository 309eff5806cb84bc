use chrono::{DateTime, Utc};
use db::models::course;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCourseReq {
    #[validate(length(min = 1, message = "code must not be empty"))]
    pub code: String,
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    #[validate(length(min = 1, message = "department must not be empty"))]
    pub department: String,
    #[validate(range(min = 2000, max = 2100, message = "academic_year is out of range"))]
    pub academic_year: i32,
}

#[derive(Debug, Deserialize)]
pub struct JoinCourseReq {
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct EnrollReq {
    pub student_id: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StartSessionReq {
    #[validate(length(min = 1, message = "title must not be empty"))]
    pub title: String,
    #[validate(range(min = -90.0, max = 90.0, message = "latitude is out of range"))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0, message = "longitude is out of range"))]
    pub longitude: f64,
    pub radius_m: Option<f64>,
    pub validity_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct CourseResponse {
    pub id: i64,
    pub faculty_id: i64,
    pub code: String,
    pub name: String,
    pub department: String,
    pub academic_year: i32,
    pub join_code: Option<String>,
    pub enrolled_count: i32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl From<course::Model> for CourseResponse {
    fn from(model: course::Model) -> Self {
        Self {
            id: model.id,
            faculty_id: model.faculty_id,
            code: model.code,
            name: model.name,
            department: model.department,
            academic_year: model.academic_year,
            join_code: model.join_code,
            enrolled_count: model.enrolled_count,
            active: model.active,
            created_at: model.created_at,
        }
    }
}
