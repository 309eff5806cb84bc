//! Attendance recording: the student scan path and the faculty manual
//! reconciliation path.
//!
//! Both paths funnel into the attendance_records append/patch log. The
//! duplicate-present check and the insert are serialized in one transaction,
//! and the partial unique index on (session_id, student_id, status='present')
//! backstops racing scans from other server instances, so two concurrent
//! scans can never both succeed.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use db::models::attendance_record::{AttendanceStatus, RecordSource};
use db::models::{attendance_record, attendance_session, enrollment};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr,
    TransactionTrait,
};
use serde::Serialize;
use tracing::info;

use crate::error::AppError;
use crate::geo;
use crate::qr_token::{QrToken, TokenSigner};
use crate::session::{owned_session, stored_token};

/// Outcome of a manual reconciliation: how many records were appended or
/// patched, and the resulting present-count.
#[derive(Debug, Clone, Serialize)]
pub struct ManualOutcome {
    pub added: usize,
    pub removed: usize,
    pub present_count: i32,
}

pub struct AttendanceService;

impl AttendanceService {
    /// Validates and records a single student scan.
    ///
    /// Order of checks: payload shape, MAC, expiry, session existence,
    /// server-side revocation, enrollment, duplicate mark, geofence. The
    /// record insert and the present-count increment commit together or not
    /// at all.
    pub async fn record_scan(
        db: &DatabaseConnection,
        signer: &TokenSigner,
        student_id: i64,
        payload: &str,
        observed_lat: f64,
        observed_lon: f64,
        now: DateTime<Utc>,
    ) -> Result<attendance_record::Model, AppError> {
        let token = QrToken::from_payload(payload)?;
        signer.verify(&token, now)?;

        if !geo::coordinates_in_range(observed_lat, observed_lon) {
            return Err(AppError::Validation(
                "scan location must be a valid coordinate pair".into(),
            ));
        }

        let session = attendance_session::Entity::find_by_id(token.session_id)
            .one(db)
            .await?
            .ok_or(AppError::NotFound("session"))?;

        // The payload carries its own proof, so revocation is server-side:
        // stopping or reissuing removes/replaces the stored copy and any
        // older payload dies here even with a valid MAC.
        match stored_token(db, session.id).await? {
            Some(stored) if stored.signature == token.signature => {}
            _ => return Err(AppError::Expired),
        }
        if !session.active {
            return Err(AppError::Expired);
        }

        let enrolled = enrollment::Entity::find()
            .filter(enrollment::Column::CourseId.eq(token.course_id))
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::Active.eq(true))
            .one(db)
            .await?
            .is_some();
        if !enrolled {
            return Err(AppError::Forbidden(
                "student is not enrolled in this course".into(),
            ));
        }

        let txn = db.begin().await?;

        let already_present = attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.eq(session.id))
            .filter(attendance_record::Column::StudentId.eq(student_id))
            .filter(attendance_record::Column::Status.eq(AttendanceStatus::Present))
            .one(&txn)
            .await?
            .is_some();
        if already_present {
            txn.rollback().await?;
            return Err(AppError::AlreadyMarked);
        }

        let distance_m = match token.geofence {
            Some(fence) => {
                let distance = geo::distance_meters(observed_lat, observed_lon, fence.lat, fence.lon);
                if distance > fence.radius_m {
                    txn.rollback().await?;
                    return Err(AppError::OutOfRange {
                        distance_m: distance,
                        radius_m: fence.radius_m,
                    });
                }
                Some(distance)
            }
            None => None,
        };

        let insert = attendance_record::ActiveModel {
            session_id: Set(session.id),
            student_id: Set(student_id),
            status: Set(AttendanceStatus::Present),
            source: Set(RecordSource::Student),
            manual: Set(false),
            distance_m: Set(distance_m),
            marked_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        let record = match insert {
            Ok(record) => record,
            // A racing scan from another instance beat us past the check;
            // the partial unique index turns that into a duplicate.
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                txn.rollback().await?;
                return Err(AppError::AlreadyMarked);
            }
            Err(e) => return Err(e.into()),
        };

        attendance_session::Entity::update_many()
            .col_expr(
                attendance_session::Column::PresentCount,
                Expr::col(attendance_session::Column::PresentCount).add(1),
            )
            .filter(attendance_session::Column::Id.eq(session.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!(
            session_id = session.id,
            student_id, "attendance recorded from scan"
        );
        Ok(record)
    }

    /// Reconciles the session's present set against `present_student_ids`.
    ///
    /// Only the delta is touched: new ids get appended `present` rows,
    /// missing ids get their present row patched to `absent` (never deleted),
    /// and everything else keeps its timestamps. Repeating the call with the
    /// same set is a no-op.
    pub async fn apply_manual(
        db: &DatabaseConnection,
        faculty_id: i64,
        session_id: i64,
        present_student_ids: &[i64],
        now: DateTime<Utc>,
    ) -> Result<ManualOutcome, AppError> {
        let session = owned_session(db, faculty_id, session_id).await?;

        let requested: HashSet<i64> = present_student_ids.iter().copied().collect();

        let txn = db.begin().await?;

        let present_rows = attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.eq(session.id))
            .filter(attendance_record::Column::Status.eq(AttendanceStatus::Present))
            .all(&txn)
            .await?;
        let current: HashSet<i64> = present_rows.iter().map(|r| r.student_id).collect();

        let additions: Vec<i64> = requested.difference(&current).copied().collect();
        let removals: Vec<&attendance_record::Model> = present_rows
            .iter()
            .filter(|r| !requested.contains(&r.student_id))
            .collect();

        for student_id in &additions {
            attendance_record::ActiveModel {
                session_id: Set(session.id),
                student_id: Set(*student_id),
                status: Set(AttendanceStatus::Present),
                source: Set(RecordSource::Faculty),
                manual: Set(true),
                distance_m: Set(None),
                marked_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
        }

        for row in &removals {
            let mut patch: attendance_record::ActiveModel = (*row).clone().into();
            patch.status = Set(AttendanceStatus::Absent);
            patch.manual = Set(true);
            patch.updated_at = Set(now);
            patch.update(&txn).await?;
        }

        let delta = additions.len() as i32 - removals.len() as i32;
        if delta != 0 {
            attendance_session::Entity::update_many()
                .col_expr(
                    attendance_session::Column::PresentCount,
                    Expr::col(attendance_session::Column::PresentCount).add(delta),
                )
                .filter(attendance_session::Column::Id.eq(session.id))
                .exec(&txn)
                .await?;
        }

        txn.commit().await?;

        info!(
            session_id,
            added = additions.len(),
            removed = removals.len(),
            "manual attendance applied"
        );
        Ok(ManualOutcome {
            added: additions.len(),
            removed: removals.len(),
            present_count: session.present_count + delta,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{CourseService, CreateCourse};
    use crate::session::{SessionService, StartSession};
    use chrono::{Duration, TimeZone};
    use db::models::course;
    use db::test_utils::setup_test_db;

    const FACULTY: i64 = 10;
    const STUDENT: i64 = 42;

    fn signer() -> TokenSigner {
        TokenSigner::new(b"attendance-test-secret")
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 20, 9, 0, 0).unwrap()
    }

    async fn seed_course(db: &DatabaseConnection) -> course::Model {
        CourseService::create(
            db,
            FACULTY,
            CreateCourse {
                code: "COS301".into(),
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
        radius_m: f64,
    ) -> (attendance_session::Model, QrToken) {
        SessionService::start(
            db,
            &signer(),
            FACULTY,
            course_id,
            StartSession {
                title: "Lecture 5".into(),
                latitude: 12.0,
                longitude: 77.0,
                radius_m: Some(radius_m),
                validity_seconds: Some(300),
            },
            t0(),
        )
        .await
        .unwrap()
    }

    async fn present_count(db: &DatabaseConnection, session_id: i64) -> i32 {
        attendance_session::Entity::find_by_id(session_id)
            .one(db)
            .await
            .unwrap()
            .unwrap()
            .present_count
    }

    #[tokio::test]
    async fn test_scan_happy_path_and_duplicate_rejection() {
        let db = setup_test_db().await;
        let course = seed_course(&db).await;
        CourseService::enroll_student(&db, FACULTY, course.id, STUDENT, t0())
            .await
            .unwrap();
        let (session, token) = seed_session(&db, course.id, 50.0).await;
        let payload = token.to_payload();

        // ~33 m north of the venue, inside the 50 m fence
        let record = AttendanceService::record_scan(
            &db,
            &signer(),
            STUDENT,
            &payload,
            12.0003,
            77.0,
            t0() + Duration::seconds(30),
        )
        .await
        .unwrap();
        assert_eq!(record.status, AttendanceStatus::Present);
        assert_eq!(record.source, RecordSource::Student);
        assert!(!record.manual);
        let measured = record.distance_m.unwrap();
        assert!((measured - 33.36).abs() < 0.5, "got {measured}");
        assert_eq!(present_count(&db, session.id).await, 1);

        // Second scan by the same student: rejected, no extra row, no
        // double increment.
        let err = AttendanceService::record_scan(
            &db,
            &signer(),
            STUDENT,
            &payload,
            12.0003,
            77.0,
            t0() + Duration::seconds(60),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::AlreadyMarked));
        assert_eq!(present_count(&db, session.id).await, 1);

        let rows = attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.eq(session.id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[tokio::test]
    async fn test_scan_rejects_unenrolled_student() {
        let db = setup_test_db().await;
        let course = seed_course(&db).await;
        let (session, token) = seed_session(&db, course.id, 50.0).await;

        let err = AttendanceService::record_scan(
            &db,
            &signer(),
            777,
            &token.to_payload(),
            12.0003,
            77.0,
            t0() + Duration::seconds(30),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        assert_eq!(present_count(&db, session.id).await, 0);
    }

    #[tokio::test]
    async fn test_scan_rejects_expired_token() {
        let db = setup_test_db().await;
        let course = seed_course(&db).await;
        CourseService::enroll_student(&db, FACULTY, course.id, STUDENT, t0())
            .await
            .unwrap();
        let (_, token) = seed_session(&db, course.id, 50.0).await;

        // nine minutes later, well past the 300 s window
        let err = AttendanceService::record_scan(
            &db,
            &signer(),
            STUDENT,
            &token.to_payload(),
            12.0003,
            77.0,
            t0() + Duration::minutes(9),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Expired));
    }

    #[tokio::test]
    async fn test_scan_rejects_tampered_and_malformed_payloads() {
        let db = setup_test_db().await;
        let course = seed_course(&db).await;
        CourseService::enroll_student(&db, FACULTY, course.id, STUDENT, t0())
            .await
            .unwrap();
        let (_, token) = seed_session(&db, course.id, 50.0).await;

        let err = AttendanceService::record_scan(
            &db,
            &signer(),
            STUDENT,
            "{{{",
            12.0,
            77.0,
            t0(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidFormat));

        let mut forged = token.clone();
        forged.expires_at += 3_600_000;
        let err = AttendanceService::record_scan(
            &db,
            &signer(),
            STUDENT,
            &forged.to_payload(),
            12.0,
            77.0,
            t0(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::InvalidSignature));
    }

    #[tokio::test]
    async fn test_scan_geofence_boundary() {
        let db = setup_test_db().await;
        let course = seed_course(&db).await;
        CourseService::enroll_student(&db, FACULTY, course.id, STUDENT, t0())
            .await
            .unwrap();

        // Exact boundary: radius set to the measured distance is accepted.
        let observed = (12.00045, 77.0);
        let boundary = geo::distance_meters(observed.0, observed.1, 12.0, 77.0);
        let (_, token) = seed_session(&db, course.id, boundary).await;
        AttendanceService::record_scan(
            &db,
            &signer(),
            STUDENT,
            &token.to_payload(),
            observed.0,
            observed.1,
            t0() + Duration::seconds(10),
        )
        .await
        .unwrap();

        // One meter tighter: rejected, and the reported distance matches.
        let other_student = 43;
        CourseService::enroll_student(&db, FACULTY, course.id, other_student, t0())
            .await
            .unwrap();
        let (tight_session, tight_token) = seed_session(&db, course.id, boundary - 1.0).await;
        let err = AttendanceService::record_scan(
            &db,
            &signer(),
            other_student,
            &tight_token.to_payload(),
            observed.0,
            observed.1,
            t0() + Duration::seconds(10),
        )
        .await
        .unwrap_err();
        match err {
            AppError::OutOfRange {
                distance_m,
                radius_m,
            } => {
                assert_eq!(distance_m, boundary);
                assert_eq!(radius_m, boundary - 1.0);
            }
            other => panic!("expected OutOfRange, got {other:?}"),
        }
        assert_eq!(present_count(&db, tight_session.id).await, 0);
    }

    #[tokio::test]
    async fn test_scan_against_stopped_session_fails_closed() {
        let db = setup_test_db().await;
        let course = seed_course(&db).await;
        CourseService::enroll_student(&db, FACULTY, course.id, STUDENT, t0())
            .await
            .unwrap();
        let (session, token) = seed_session(&db, course.id, 50.0).await;

        SessionService::stop(&db, FACULTY, session.id, t0() + Duration::seconds(60))
            .await
            .unwrap();

        // The MAC is still valid and the window has not elapsed, but the
        // stored copy is gone.
        let err = AttendanceService::record_scan(
            &db,
            &signer(),
            STUDENT,
            &token.to_payload(),
            12.0003,
            77.0,
            t0() + Duration::seconds(90),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Expired));
    }

    #[tokio::test]
    async fn test_scan_against_superseded_token_fails_closed() {
        let db = setup_test_db().await;
        let course = seed_course(&db).await;
        CourseService::enroll_student(&db, FACULTY, course.id, STUDENT, t0())
            .await
            .unwrap();
        let (session, first) = seed_session(&db, course.id, 50.0).await;

        SessionService::reissue_qr(
            &db,
            &signer(),
            FACULTY,
            session.id,
            Some(300),
            t0() + Duration::seconds(30),
        )
        .await
        .unwrap();

        let err = AttendanceService::record_scan(
            &db,
            &signer(),
            STUDENT,
            &first.to_payload(),
            12.0003,
            77.0,
            t0() + Duration::seconds(60),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AppError::Expired));
    }

    #[tokio::test]
    async fn test_manual_reconciliation_touches_only_the_delta() {
        let db = setup_test_db().await;
        let course = seed_course(&db).await;
        for sid in [1, 2, 3] {
            CourseService::enroll_student(&db, FACULTY, course.id, sid, t0())
                .await
                .unwrap();
        }
        let (session, _) = seed_session(&db, course.id, 50.0).await;

        let outcome = AttendanceService::apply_manual(
            &db,
            FACULTY,
            session.id,
            &[1, 2],
            t0() + Duration::minutes(10),
        )
        .await
        .unwrap();
        assert_eq!(outcome.added, 2);
        assert_eq!(outcome.removed, 0);
        assert_eq!(outcome.present_count, 2);
        assert_eq!(present_count(&db, session.id).await, 2);

        // Same set again: pure no-op.
        let outcome = AttendanceService::apply_manual(
            &db,
            FACULTY,
            session.id,
            &[1, 2],
            t0() + Duration::minutes(11),
        )
        .await
        .unwrap();
        assert_eq!(outcome.added, 0);
        assert_eq!(outcome.removed, 0);
        assert_eq!(present_count(&db, session.id).await, 2);

        // Swap one student: one append, one patch to absent, history kept.
        let outcome = AttendanceService::apply_manual(
            &db,
            FACULTY,
            session.id,
            &[2, 3],
            t0() + Duration::minutes(12),
        )
        .await
        .unwrap();
        assert_eq!(outcome.added, 1);
        assert_eq!(outcome.removed, 1);
        assert_eq!(present_count(&db, session.id).await, 2);

        let rows = attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.eq(session.id))
            .filter(attendance_record::Column::StudentId.eq(1))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::Absent);
        assert!(rows[0].manual);
    }

    #[tokio::test]
    async fn test_manual_reconciliation_requires_owner() {
        let db = setup_test_db().await;
        let course = seed_course(&db).await;
        let (session, _) = seed_session(&db, course.id, 50.0).await;

        let err = AttendanceService::apply_manual(&db, 99, session.id, &[1], t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let err = AttendanceService::apply_manual(&db, FACULTY, session.id + 50, &[1], t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound("session")));
    }

    #[tokio::test]
    async fn test_rescan_after_manual_removal_appends_new_row() {
        let db = setup_test_db().await;
        let course = seed_course(&db).await;
        CourseService::enroll_student(&db, FACULTY, course.id, STUDENT, t0())
            .await
            .unwrap();
        let (session, token) = seed_session(&db, course.id, 50.0).await;
        let payload = token.to_payload();

        AttendanceService::record_scan(
            &db,
            &signer(),
            STUDENT,
            &payload,
            12.0003,
            77.0,
            t0() + Duration::seconds(30),
        )
        .await
        .unwrap();

        AttendanceService::apply_manual(&db, FACULTY, session.id, &[], t0() + Duration::seconds(60))
            .await
            .unwrap();
        assert_eq!(present_count(&db, session.id).await, 0);

        // No present row remains, so a fresh scan appends a second row
        // rather than tripping the duplicate check.
        AttendanceService::record_scan(
            &db,
            &signer(),
            STUDENT,
            &payload,
            12.0003,
            77.0,
            t0() + Duration::seconds(90),
        )
        .await
        .unwrap();
        assert_eq!(present_count(&db, session.id).await, 1);

        let rows = attendance_record::Entity::find()
            .filter(attendance_record::Column::SessionId.eq(session.id))
            .filter(attendance_record::Column::StudentId.eq(STUDENT))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);
    }
}
