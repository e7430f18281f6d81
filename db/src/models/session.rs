//! One scheduled occurrence of a class and its lifecycle state.

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub class_id: i64,
    pub scheduled_start: DateTime<Utc>,

    pub status: SessionStatus,
    pub scanning_enabled: bool,

    /// Opaque handle minted when the session is started.
    pub session_token: Option<String>,
    pub started_by: Option<i64>,
    pub started_at: Option<DateTime<Utc>>,

    pub delayed_by: Option<i64>,
    pub delay_reason: Option<String>,
    pub delayed_at: Option<DateTime<Utc>>,
    pub new_start_time: Option<DateTime<Utc>>,

    pub cancelled_by: Option<i64>,
    pub cancellation_reason: Option<String>,
    pub cancelled_at: Option<DateTime<Utc>>,

    pub room_change_from: Option<String>,
    pub room_change_to: Option<String>,
    pub room_changed_by: Option<i64>,
    pub room_changed_at: Option<DateTime<Utc>>,
}

/// Lifecycle status of a session.
///
/// Only `start` and `cancel` move a session between statuses; delays, room
/// changes and scanning toggles are side attributes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum SessionStatus {
    #[sea_orm(string_value = "scheduled")]
    Scheduled,
    #[sea_orm(string_value = "in_progress")]
    InProgress,
    #[sea_orm(string_value = "delayed")]
    Delayed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
    #[sea_orm(string_value = "completed")]
    Completed,
}

impl SessionStatus {
    /// No transition may leave a terminal status.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStatus::Cancelled | SessionStatus::Completed)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id",
        on_delete = "Cascade"
    )]
    Class,
    #[sea_orm(has_many = "super::qr_generation::Entity")]
    Credentials,
    #[sea_orm(has_many = "super::attendance_log::Entity")]
    Attendance,
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::qr_generation::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Credentials.def()
    }
}

impl Related<super::attendance_log::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Attendance.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Schedules a new session. Scheduling belongs to the timetable
    /// collaborator; this exists for seeding and tests.
    pub async fn create<C>(
        db: &C,
        class_id: i64,
        scheduled_start: DateTime<Utc>,
    ) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        ActiveModel {
            class_id: Set(class_id),
            scheduled_start: Set(scheduled_start),
            status: Set(SessionStatus::Scheduled),
            scanning_enabled: Set(false),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    pub async fn find_in_class<C>(
        db: &C,
        class_id: i64,
        session_id: i64,
    ) -> Result<Option<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find_by_id(session_id)
            .filter(Column::ClassId.eq(class_id))
            .one(db)
            .await
    }

    /// Whether credentials may currently be issued against this session.
    pub fn is_accepting_scans(&self) -> bool {
        self.status == SessionStatus::InProgress && self.scanning_enabled
    }
}
