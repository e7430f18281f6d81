use sea_orm_migration::prelude::*;

use crate::migrations;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(migrations::m202512110001_create_users::Migration),
            Box::new(migrations::m202512110002_create_classes::Migration),
            Box::new(migrations::m202512110003_create_sessions::Migration),
            Box::new(migrations::m202512110004_create_qr_generations::Migration),
            Box::new(migrations::m202512110005_create_attendance_logs::Migration),
            Box::new(migrations::m202512110006_create_lecturer_verifications::Migration),
            Box::new(migrations::m202512110007_create_audit_logs::Migration),
        ]
    }
}
