//! Course and enrollment management.
//!
//! Enrollment rows are never deleted: dropping a student deactivates the row
//! and re-enrolling reactivates it, so the (course, student) pair stays
//! unique for the lifetime of the course. The enrolled-count counter moves
//! with single-statement increments, never read-modify-write.

use chrono::{DateTime, Utc};
use db::models::{course, enrollment};
use db::models::enrollment::EnrollmentSource;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, Set, TransactionTrait,
};
use tracing::info;

use crate::error::AppError;

/// Join codes avoid 0/O, 1/I and lowercase so they survive being read aloud
/// or typed from a projector.
pub const JOIN_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const JOIN_CODE_LEN: usize = 6;

#[derive(Debug, Clone)]
pub struct CreateCourse {
    pub code: String,
    pub name: String,
    pub department: String,
    pub academic_year: i32,
}

pub struct CourseService;

impl CourseService {
    pub async fn create(
        db: &DatabaseConnection,
        faculty_id: i64,
        params: CreateCourse,
        now: DateTime<Utc>,
    ) -> Result<course::Model, AppError> {
        for (field, value) in [
            ("code", &params.code),
            ("name", &params.name),
            ("department", &params.department),
        ] {
            if value.trim().is_empty() {
                return Err(AppError::Validation(format!("{field} must not be empty")));
            }
        }

        let join_code = Self::generate_join_code(db).await?;

        let created = course::ActiveModel {
            faculty_id: Set(faculty_id),
            code: Set(params.code.trim().to_owned()),
            name: Set(params.name.trim().to_owned()),
            department: Set(params.department.trim().to_owned()),
            academic_year: Set(params.academic_year),
            join_code: Set(Some(join_code)),
            enrolled_count: Set(0),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await?;

        info!(course_id = created.id, faculty_id, "course created");
        Ok(created)
    }

    /// Draws 6 characters from the join-code alphabet and retries until the
    /// code collides with no existing course. The unique index on the column
    /// backstops a racing insert.
    async fn generate_join_code(db: &DatabaseConnection) -> Result<String, AppError> {
        use rand::Rng;

        loop {
            let code: String = (0..JOIN_CODE_LEN)
                .map(|_| {
                    let idx = rand::rngs::OsRng.gen_range(0..JOIN_CODE_ALPHABET.len());
                    JOIN_CODE_ALPHABET[idx] as char
                })
                .collect();

            let clash = course::Entity::find()
                .filter(course::Column::JoinCode.eq(code.clone()))
                .one(db)
                .await?
                .is_some();
            if !clash {
                return Ok(code);
            }
        }
    }

    /// Self-service enrollment with a join code. Lookup is case-insensitive;
    /// codes are stored uppercase.
    pub async fn join_by_code(
        db: &DatabaseConnection,
        student_id: i64,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<(course::Model, enrollment::Model), AppError> {
        let normalized = code.trim().to_uppercase();
        if normalized.len() != JOIN_CODE_LEN
            || !normalized.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b))
        {
            return Err(AppError::Validation(format!(
                "join code must be {JOIN_CODE_LEN} characters from the code alphabet"
            )));
        }

        let course = course::Entity::find()
            .filter(course::Column::JoinCode.eq(normalized))
            .filter(course::Column::Active.eq(true))
            .one(db)
            .await?
            .ok_or(AppError::NotFound("course"))?;

        let txn = db.begin().await?;
        let row = enroll_in_txn(&txn, &course, student_id, EnrollmentSource::JoinCode, now).await?;
        txn.commit().await?;

        Ok((course, row))
    }

    /// Faculty-side direct grant.
    pub async fn enroll_student(
        db: &DatabaseConnection,
        faculty_id: i64,
        course_id: i64,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<enrollment::Model, AppError> {
        let course = owned_course(db, faculty_id, course_id).await?;

        let txn = db.begin().await?;
        let row = enroll_in_txn(&txn, &course, student_id, EnrollmentSource::Direct, now).await?;
        txn.commit().await?;

        Ok(row)
    }

    pub async fn drop_student(
        db: &DatabaseConnection,
        faculty_id: i64,
        course_id: i64,
        student_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), AppError> {
        let course = owned_course(db, faculty_id, course_id).await?;

        let existing = enrollment::Entity::find()
            .filter(enrollment::Column::CourseId.eq(course.id))
            .filter(enrollment::Column::StudentId.eq(student_id))
            .filter(enrollment::Column::Active.eq(true))
            .one(db)
            .await?
            .ok_or(AppError::NotFound("enrollment"))?;

        let txn = db.begin().await?;

        let mut active: enrollment::ActiveModel = existing.into();
        active.active = Set(false);
        active.updated_at = Set(now);
        active.update(&txn).await?;

        course::Entity::update_many()
            .col_expr(
                course::Column::EnrolledCount,
                Expr::col(course::Column::EnrolledCount).add(-1),
            )
            .filter(course::Column::Id.eq(course.id))
            .exec(&txn)
            .await?;

        txn.commit().await?;
        Ok(())
    }

    /// Courses the principal owns, and courses they are actively enrolled in.
    pub async fn courses_for(
        db: &DatabaseConnection,
        principal_id: i64,
    ) -> Result<(Vec<course::Model>, Vec<course::Model>), AppError> {
        let owned = course::Entity::find()
            .filter(course::Column::FacultyId.eq(principal_id))
            .all(db)
            .await?;

        let enrollments = enrollment::Entity::find()
            .filter(enrollment::Column::StudentId.eq(principal_id))
            .filter(enrollment::Column::Active.eq(true))
            .all(db)
            .await?;
        let course_ids: Vec<i64> = enrollments.iter().map(|e| e.course_id).collect();
        let enrolled = if course_ids.is_empty() {
            Vec::new()
        } else {
            course::Entity::find()
                .filter(course::Column::Id.is_in(course_ids))
                .all(db)
                .await?
        };

        Ok((owned, enrolled))
    }
}

pub(crate) async fn owned_course(
    db: &DatabaseConnection,
    faculty_id: i64,
    course_id: i64,
) -> Result<course::Model, AppError> {
    let course = course::Entity::find_by_id(course_id)
        .one(db)
        .await?
        .ok_or(AppError::NotFound("course"))?;
    if course.faculty_id != faculty_id {
        return Err(AppError::Forbidden(
            "only the course owner may manage enrollments".into(),
        ));
    }
    Ok(course)
}

async fn enroll_in_txn(
    txn: &DatabaseTransaction,
    course: &course::Model,
    student_id: i64,
    source: EnrollmentSource,
    now: DateTime<Utc>,
) -> Result<enrollment::Model, AppError> {
    let existing = enrollment::Entity::find()
        .filter(enrollment::Column::CourseId.eq(course.id))
        .filter(enrollment::Column::StudentId.eq(student_id))
        .one(txn)
        .await?;

    let row = match existing {
        Some(e) if e.active => {
            return Err(AppError::Validation(
                "student is already enrolled in this course".into(),
            ));
        }
        Some(e) => {
            let mut active: enrollment::ActiveModel = e.into();
            active.active = Set(true);
            active.source = Set(source);
            active.updated_at = Set(now);
            active.update(txn).await?
        }
        None => {
            enrollment::ActiveModel {
                course_id: Set(course.id),
                student_id: Set(student_id),
                active: Set(true),
                source: Set(source),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(txn)
            .await?
        }
    };

    course::Entity::update_many()
        .col_expr(
            course::Column::EnrolledCount,
            Expr::col(course::Column::EnrolledCount).add(1),
        )
        .filter(course::Column::Id.eq(course.id))
        .exec(txn)
        .await?;

    Ok(row)
}
