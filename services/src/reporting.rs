//! Read-side aggregation over the persisted entities: student dashboard,
//! live session roster, and the enrolled roster with per-session flags.
//!
//! Cross-entity joins are done with batched `is_in` lookups rather than one
//! point lookup per row.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use db::models::attendance_record::AttendanceStatus;
use db::models::{attendance_record, attendance_session, course, enrollment, student_profile};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
};
use serde::Serialize;

use crate::error::AppError;
use crate::session::owned_session;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSession {
    pub session_id: i64,
    pub course_id: i64,
    pub course_code: String,
    pub course_name: String,
    pub title: String,
    pub active: bool,
    pub started_at: DateTime<Utc>,
    pub marked_present: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct StudentDashboard {
    pub today_sessions: Vec<DashboardSession>,
    pub records_present: u64,
    pub records_total: u64,
    /// Present records over all historical records, as a percentage. Zero
    /// when the student has no records at all.
    pub attendance_percentage: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LiveRosterEntry {
    pub student_id: i64,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub distance_m: Option<f64>,
    pub manual: bool,
    pub marked_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RosterEntry {
    pub student_id: i64,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub present: bool,
}

pub struct ReportingService;

impl ReportingService {
    /// Today's sessions across the student's active enrollments, plus the
    /// running attendance percentage over all of their records.
    pub async fn student_dashboard(
        db: &DatabaseConnection,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<StudentDashboard, AppError> {
        let enrollments = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::Active.eq(true))
            .all(db)
            .await?;
        let course_ids: Vec<i64> = enrollments.iter().map(|e| e.course_id).collect();

        let mut today_sessions = Vec::new();
        if !course_ids.is_empty() {
            let day_start = now.date_naive().and_time(NaiveTime::MIN).and_utc();
            let day_end = day_start + Duration::days(1);

            let sessions = attendance_session::Entity::find()
                .filter(attendance_session::Column::CourseId.is_in(course_ids.clone()))
                .filter(attendance_session::Column::StartedAt.gte(day_start))
                .filter(attendance_session::Column::StartedAt.lt(day_end))
                .order_by_desc(attendance_session::Column::StartedAt)
                .all(db)
                .await?;

            let courses: HashMap<i64, course::Model> = course::Entity::find()
                .filter(course::Column::Id.is_in(course_ids))
                .all(db)
                .await?
                .into_iter()
                .map(|c| (c.id, c))
                .collect();

            let session_ids: Vec<i64> = sessions.iter().map(|s| s.id).collect();
            let present_in: HashSet<i64> = if session_ids.is_empty() {
                HashSet::new()
            } else {
                attendance_record::Entity::find()
                    .filter(attendance_record::Column::SessionId.is_in(session_ids))
                    .filter(attendance_record::Column::StudentId.eq(student_id))
                    .filter(attendance_record::Column::Status.eq(AttendanceStatus::Present))
                    .all(db)
                    .await?
                    .into_iter()
                    .map(|r| r.session_id)
                    .collect()
            };

            for session in sessions {
                let Some(course) = courses.get(&session.course_id) else {
                    continue;
                };
                today_sessions.push(DashboardSession {
                    session_id: session.id,
                    course_id: course.id,
                    course_code: course.code.clone(),
                    course_name: course.name.clone(),
                    title: session.title,
                    active: session.active,
                    started_at: session.started_at,
                    marked_present: present_in.contains(&session.id),
                });
            }
        }

        let records_total = attendance_record::Entity::find()
            .filter(attendance_record::Column::StudentId.eq(student_id))
            .count(db)
            .await?;
        let records_present = attendance_record::Entity::find()
            .filter(attendance_record::Column::StudentId.eq(student_id))
            .filter(attendance_record::Column::Status.eq(AttendanceStatus::Present))
            .count(db)
            .await?;
        let attendance_percentage = if records_total == 0 {
            0.0
        } else {
            records_present as f64 / records_total as f64 * 100.0
        };

        Ok(StudentDashboard {
            today_sessions,
            records_present,
            records_total,
            attendance_percentage,
        })
    }

    /// Current attendees of a session joined with profile fields, most
    /// recently marked first. Owner-only.
    pub async fn live_roster(
        db: &DatabaseConnection,
        faculty_id: i64,
        session_id: i64,
    ) -> Result<Vec<LiveRosterEntry>, AppError> {
        let session = owned_session(db, faculty_id, session_id).await?;

        let rows = attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.eq(session.id))
            .filter(attendance_record::Column::Status.eq(AttendanceStatus::Present))
            .order_by_desc(attendance_record::Column::MarkedAt)
            .all(db)
            .await?;

        let profiles = profiles_for(db, rows.iter().map(|r| r.student_id).collect()).await?;

        Ok(rows
            .into_iter()
            .map(|r| {
                let profile = profiles.get(&r.student_id);
                LiveRosterEntry {
                    student_id: r.student_id,
                    display_name: profile.and_then(|p| p.display_name.clone()),
                    email: profile.and_then(|p| p.email.clone()),
                    distance_m: r.distance_m,
                    manual: r.manual,
                    marked_at: r.marked_at,
                }
            })
            .collect())
    }

    /// Every actively enrolled student of the session's course, flagged
    /// present or absent for this session. Owner-only.
    pub async fn session_roster(
        db: &DatabaseConnection,
        faculty_id: i64,
        session_id: i64,
    ) -> Result<Vec<RosterEntry>, AppError> {
        let session = owned_session(db, faculty_id, session_id).await?;

        let enrollments = enrollment::Entity::find()
            .filter(enrollment::Column::CourseId.eq(session.course_id))
            .filter(enrollment::Column::Active.eq(true))
            .order_by_asc(enrollment::Column::StudentId)
            .all(db)
            .await?;

        let present: HashSet<i64> = attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.eq(session.id))
            .filter(attendance_record::Column::Status.eq(AttendanceStatus::Present))
            .all(db)
            .await?
            .into_iter()
            .map(|r| r.student_id)
            .collect();

        let profiles = profiles_for(db, enrollments.iter().map(|e| e.student_id).collect()).await?;

        Ok(enrollments
            .into_iter()
            .map(|e| {
                let profile = profiles.get(&e.student_id);
                RosterEntry {
                    student_id: e.student_id,
                    display_name: profile.and_then(|p| p.display_name.clone()),
                    email: profile.and_then(|p| p.email.clone()),
                    present: present.contains(&e.student_id),
                }
            })
            .collect())
    }
}

async fn profiles_for(
    db: &DatabaseConnection,
    student_ids: Vec<i64>,
) -> Result<HashMap<i64, student_profile::Model>, AppError> {
    if student_ids.is_empty() {
        return Ok(HashMap::new());
    }
    Ok(student_profile::Entity::find()
        .filter(student_profile::Column::StudentId.is_in(student_ids))
        .all(db)
        .await?
        .into_iter()
        .map(|p| (p.student_id, p))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::AttendanceService;
    use crate::course::{CourseService, CreateCourse};
    use crate::profile::{ProfileService, UpdateStudentProfile};
    use crate::qr_token::TokenSigner;
    use crate::session::{SessionService, StartSession};
    use chrono::TimeZone;
    use db::test_utils::setup_test_db;

    const FACULTY: i64 = 10;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"reporting-test-secret")
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 20, 9, 0, 0).unwrap()
    }

    async fn seed_course(db: &DatabaseConnection, code: &str) -> course::Model {
        CourseService::create(
            db,
            FACULTY,
            CreateCourse {
                code: code.into(),
                name: "Software Engineering".into(),
                department: "Computer Science".into(),
                academic_year: 2026,
            },
            t0(),
        )
        .await
        .unwrap()
    }

    async fn seed_session(
        db: &DatabaseConnection,
        course_id: i64,
        now: DateTime<Utc>,
    ) -> (attendance_session::Model, crate::qr_token::QrToken) {
        SessionService::start(
            db,
            &signer(),
            FACULTY,
            course_id,
            StartSession {
                title: "Lecture".into(),
                latitude: 12.0,
                longitude: 77.0,
                radius_m: Some(50.0),
                validity_seconds: Some(300),
            },
            now,
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_dashboard_lists_today_and_computes_percentage() {
        let db = setup_test_db().await;
        let course = seed_course(&db, "COS301").await;
        CourseService::enroll_student(&db, FACULTY, course.id, 42, t0())
            .await
            .unwrap();

        // A session from yesterday the student attended, and one today they
        // have not scanned into yet.
        let yesterday = t0() - Duration::days(1);
        let (old_session, old_token) = seed_session(&db, course.id, yesterday).await;
        AttendanceService::record_scan(
            &db,
            &signer(),
            42,
            &old_token.to_payload(),
            12.0003,
            77.0,
            yesterday + Duration::seconds(30),
        )
        .await
        .unwrap();
        AttendanceService::apply_manual(&db, FACULTY, old_session.id, &[], yesterday + Duration::hours(1))
            .await
            .unwrap();

        let (today_session, _) = seed_session(&db, course.id, t0()).await;

        let dashboard = ReportingService::student_dashboard(&db, 42, t0() + Duration::hours(1))
            .await
            .unwrap();

        assert_eq!(dashboard.today_sessions.len(), 1);
        let entry = &dashboard.today_sessions[0];
        assert_eq!(entry.session_id, today_session.id);
        assert_eq!(entry.course_code, "COS301");
        assert!(!entry.marked_present);

        // One present row flipped to absent by the manual pass: 0 / 1.
        assert_eq!(dashboard.records_total, 1);
        assert_eq!(dashboard.records_present, 0);
        assert_eq!(dashboard.attendance_percentage, 0.0);
    }

    #[tokio::test]
    async fn test_dashboard_with_no_history_is_zero() {
        let db = setup_test_db().await;
        let dashboard = ReportingService::student_dashboard(&db, 42, t0())
            .await
            .unwrap();
        assert!(dashboard.today_sessions.is_empty());
        assert_eq!(dashboard.records_total, 0);
        assert_eq!(dashboard.attendance_percentage, 0.0);
    }

    #[tokio::test]
    async fn test_live_roster_sorted_most_recent_first_with_profiles() {
        let db = setup_test_db().await;
        let course = seed_course(&db, "COS301").await;
        for sid in [1, 2] {
            CourseService::enroll_student(&db, FACULTY, course.id, sid, t0())
                .await
                .unwrap();
        }
        ProfileService::upsert_student(
            &db,
            1,
            UpdateStudentProfile {
                display_name: Some("Ada".into()),
                email: Some("ada@example.edu".into()),
                ..Default::default()
            },
            t0(),
        )
        .await
        .unwrap();

        let (session, token) = seed_session(&db, course.id, t0()).await;
        let payload = token.to_payload();
        AttendanceService::record_scan(&db, &signer(), 1, &payload, 12.0003, 77.0, t0() + Duration::seconds(10))
            .await
            .unwrap();
        AttendanceService::record_scan(&db, &signer(), 2, &payload, 12.0003, 77.0, t0() + Duration::seconds(90))
            .await
            .unwrap();

        let roster = ReportingService::live_roster(&db, FACULTY, session.id)
            .await
            .unwrap();
        assert_eq!(roster.len(), 2);
        // student 2 marked later, so comes first
        assert_eq!(roster[0].student_id, 2);
        assert!(roster[0].display_name.is_none());
        assert_eq!(roster[1].student_id, 1);
        assert_eq!(roster[1].display_name.as_deref(), Some("Ada"));
        assert!(roster[1].distance_m.is_some());
    }

    #[tokio::test]
    async fn test_session_roster_flags_present_and_absent() {
        let db = setup_test_db().await;
        let course = seed_course(&db, "COS301").await;
        for sid in [1, 2, 3] {
            CourseService::enroll_student(&db, FACULTY, course.id, sid, t0())
                .await
                .unwrap();
        }
        let (session, token) = seed_session(&db, course.id, t0()).await;
        AttendanceService::record_scan(
            &db,
            &signer(),
            2,
            &token.to_payload(),
            12.0003,
            77.0,
            t0() + Duration::seconds(10),
        )
        .await
        .unwrap();

        let roster = ReportingService::session_roster(&db, FACULTY, session.id)
            .await
            .unwrap();
        assert_eq!(roster.len(), 3);
        assert_eq!(
            roster.iter().map(|r| (r.student_id, r.present)).collect::<Vec<_>>(),
            vec![(1, false), (2, true), (3, false)]
        );
    }

    #[tokio::test]
    async fn test_rosters_require_session_owner() {
        let db = setup_test_db().await;
        let course = seed_course(&db, "COS301").await;
        let (session, _) = seed_session(&db, course.id, t0()).await;

        let err = ReportingService::live_roster(&db, 99, session.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = ReportingService::session_roster(&db, FACULTY, session.id + 40)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("session")));
    }
}
