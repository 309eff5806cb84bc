//! Owner-scoped profile documents with upsert-merge semantics: a request
//! only overwrites the fields it actually carries, so partial updates never
//! blank out stored values.

use chrono::{DateTime, Utc};
use db::models::{faculty_profile, student_profile};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use serde::Deserialize;

use crate::error::AppError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateStudentProfile {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub program: Option<String>,
    pub year_of_study: Option<i32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateFacultyProfile {
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub department: Option<String>,
    pub title: Option<String>,
}

pub struct ProfileService;

impl ProfileService {
    pub async fn get_student(
        db: &DatabaseConnection,
        student_id: i64,
    ) -> Result<Option<student_profile::Model>, AppError> {
        Ok(student_profile::Entity::find_by_id(student_id)
            .one(db)
            .await?)
    }

    pub async fn upsert_student(
        db: &DatabaseConnection,
        student_id: i64,
        update: UpdateStudentProfile,
        now: DateTime<Utc>,
    ) -> Result<student_profile::Model, AppError> {
        let existing = student_profile::Entity::find_by_id(student_id)
            .one(db)
            .await?;

        let model = match existing {
            Some(existing) => {
                let mut patch: student_profile::ActiveModel = existing.into();
                if let Some(v) = update.display_name {
                    patch.display_name = Set(Some(v));
                }
                if let Some(v) = update.email {
                    patch.email = Set(Some(v));
                }
                if let Some(v) = update.phone {
                    patch.phone = Set(Some(v));
                }
                if let Some(v) = update.program {
                    patch.program = Set(Some(v));
                }
                if let Some(v) = update.year_of_study {
                    patch.year_of_study = Set(Some(v));
                }
                patch.updated_at = Set(now);
                patch.update(db).await?
            }
            None => {
                student_profile::ActiveModel {
                    student_id: Set(student_id),
                    display_name: Set(update.display_name),
                    email: Set(update.email),
                    phone: Set(update.phone),
                    program: Set(update.program),
                    year_of_study: Set(update.year_of_study),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(db)
                .await?
            }
        };

        Ok(model)
    }

    pub async fn get_faculty(
        db: &DatabaseConnection,
        faculty_id: i64,
    ) -> Result<Option<faculty_profile::Model>, AppError> {
        Ok(faculty_profile::Entity::find_by_id(faculty_id)
            .one(db)
            .await?)
    }

    pub async fn upsert_faculty(
        db: &DatabaseConnection,
        faculty_id: i64,
        update: UpdateFacultyProfile,
        now: DateTime<Utc>,
    ) -> Result<faculty_profile::Model, AppError> {
        let existing = faculty_profile::Entity::find_by_id(faculty_id)
            .one(db)
            .await?;

        let model = match existing {
            Some(existing) => {
                let mut patch: faculty_profile::ActiveModel = existing.into();
                if let Some(v) = update.display_name {
                    patch.display_name = Set(Some(v));
                }
                if let Some(v) = update.email {
                    patch.email = Set(Some(v));
                }
                if let Some(v) = update.phone {
                    patch.phone = Set(Some(v));
                }
                if let Some(v) = update.department {
                    patch.department = Set(Some(v));
                }
                if let Some(v) = update.title {
                    patch.title = Set(Some(v));
                }
                patch.updated_at = Set(now);
                patch.update(db).await?
            }
            None => {
                faculty_profile::ActiveModel {
                    faculty_id: Set(faculty_id),
                    display_name: Set(update.display_name),
                    email: Set(update.email),
                    phone: Set(update.phone),
                    department: Set(update.department),
                    title: Set(update.title),
                    created_at: Set(now),
                    updated_at: Set(now),
                }
                .insert(db)
                .await?
            }
        };

        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use db::test_utils::setup_test_db;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 1, 8, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_upsert_creates_then_merges() {
        let db = setup_test_db().await;

        let created = ProfileService::upsert_student(
            &db,
            42,
            UpdateStudentProfile {
                display_name: Some("Thandi N".into()),
                email: Some("thandi@example.edu".into()),
                program: Some("BSc CS".into()),
                ..Default::default()
            },
            now(),
        )
        .await
        .unwrap();
        assert_eq!(created.display_name.as_deref(), Some("Thandi N"));
        assert!(created.phone.is_none());

        // Partial update: untouched fields must survive.
        let merged = ProfileService::upsert_student(
            &db,
            42,
            UpdateStudentProfile {
                phone: Some("+27 82 000 0000".into()),
                ..Default::default()
            },
            now() + chrono::Duration::days(1),
        )
        .await
        .unwrap();
        assert_eq!(merged.display_name.as_deref(), Some("Thandi N"));
        assert_eq!(merged.email.as_deref(), Some("thandi@example.edu"));
        assert_eq!(merged.phone.as_deref(), Some("+27 82 000 0000"));
        assert_eq!(merged.program.as_deref(), Some("BSc CS"));
    }

    #[tokio::test]
    async fn test_faculty_profile_is_separate_from_student_profile() {
        let db = setup_test_db().await;

        ProfileService::upsert_faculty(
            &db,
            7,
            UpdateFacultyProfile {
                display_name: Some("Dr M Patel".into()),
                department: Some("Computer Science".into()),
                ..Default::default()
            },
            now(),
        )
        .await
        .unwrap();

        assert!(ProfileService::get_student(&db, 7).await.unwrap().is_none());
        let faculty = ProfileService::get_faculty(&db, 7).await.unwrap().unwrap();
        assert_eq!(faculty.department.as_deref(), Some("Computer Science"));
    }
}
