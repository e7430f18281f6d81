//! Immutable history rows explaining how an attendance record reached its status.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, QuerySelect};
use serde::Serialize;

use super::attendance_log::AttendanceStatus;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "lecturer_verifications")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub lecturer_id: i64,
    pub attendance_id: i64,
    pub student_id: i64,
    pub class_id: i64,
    pub session_id: i64,
    /// `None` when the entry created the attendance record.
    pub original_status: Option<AttendanceStatus>,
    pub verified_status: AttendanceStatus,
    pub verification_reason: Option<String>,
    pub verification_notes: Option<String>,
    pub device_id: Option<String>,
    pub device_fingerprint: Option<String>,
    pub verified_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_log::Entity",
        from = "Column::AttendanceId",
        to = "super::attendance_log::Column::Id",
        on_delete = "Cascade"
    )]
    Attendance,
}

impl Related<super::attendance_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Entries for one attendance record, newest first.
    pub async fn for_attendance<C>(
        db: &C,
        attendance_id: i64,
        limit: u64,
    ) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::AttendanceId.eq(attendance_id))
            .order_by_desc(Column::VerifiedAt)
            .order_by_desc(Column::Id)
            .limit(limit)
            .all(db)
            .await
    }

    pub async fn count_for_attendance<C>(db: &C, attendance_id: i64) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::AttendanceId.eq(attendance_id))
            .count(db)
            .await
    }
}
