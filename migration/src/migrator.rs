use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202607010001_create_courses::Migration),
            Box::new(migrations::m202607010002_create_enrollments::Migration),
            Box::new(migrations::m202607050001_create_attendance::Migration),
            Box::new(migrations::m202607120001_create_profiles::Migration),
        ]
    }
}
