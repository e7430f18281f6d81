//! Append-only trail of state-changing actions.

use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::sea_query::Expr;
use sea_orm::{Condition, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "audit_logs")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: i64,
    pub class_id: Option<i64>,
    pub session_id: Option<i64>,
    pub old_value: Option<Json>,
    pub new_value: Option<Json>,
    pub device_id: Option<String>,
    pub device_fingerprint: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sea_orm(rs_type = "String", db_type = "Text")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE", ascii_case_insensitive)]
pub enum AuditAction {
    #[sea_orm(string_value = "SESSION_STARTED")]
    SessionStarted,
    #[sea_orm(string_value = "SESSION_DELAYED")]
    SessionDelayed,
    #[sea_orm(string_value = "SESSION_CANCELLED")]
    SessionCancelled,
    #[sea_orm(string_value = "ROOM_CHANGED")]
    RoomChanged,
    #[sea_orm(string_value = "SCANNING_ENABLED")]
    ScanningEnabled,
    #[sea_orm(string_value = "SCANNING_DISABLED")]
    ScanningDisabled,
    #[sea_orm(string_value = "QR_GENERATED")]
    QrGenerated,
    #[sea_orm(string_value = "QR_ROTATED")]
    QrRotated,
    #[sea_orm(string_value = "QR_REVOKED")]
    QrRevoked,
    #[sea_orm(string_value = "ATTENDANCE_CREATED")]
    AttendanceCreated,
    #[sea_orm(string_value = "ATTENDANCE_MARKED")]
    AttendanceMarked,
    #[sea_orm(string_value = "BULK_ATTENDANCE_MARKED")]
    BulkAttendanceMarked,
    #[sea_orm(string_value = "ATTENDANCE_VERIFIED")]
    AttendanceVerified,
    #[sea_orm(string_value = "ATTENDANCE_UNVERIFIED")]
    AttendanceUnverified,
    #[sea_orm(string_value = "ATTENDANCE_CHECKED_IN")]
    AttendanceCheckedIn,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Fields supplied by callers when appending an entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAuditEntry {
    pub user_id: i64,
    pub action: AuditAction,
    pub resource_type: String,
    pub resource_id: i64,
    pub class_id: Option<i64>,
    pub session_id: Option<i64>,
    pub old_value: Option<Json>,
    pub new_value: Option<Json>,
    pub device_id: Option<String>,
    pub device_fingerprint: Option<String>,
}

impl NewAuditEntry {
    pub fn new(
        user_id: i64,
        action: AuditAction,
        resource_type: impl Into<String>,
        resource_id: i64,
    ) -> Self {
        Self {
            user_id,
            action,
            resource_type: resource_type.into(),
            resource_id,
            class_id: None,
            session_id: None,
            old_value: None,
            new_value: None,
            device_id: None,
            device_fingerprint: None,
        }
    }

    pub fn scoped(mut self, class_id: i64, session_id: Option<i64>) -> Self {
        self.class_id = Some(class_id);
        self.session_id = session_id;
        self
    }

    pub fn with_values(mut self, old_value: Option<Json>, new_value: Option<Json>) -> Self {
        self.old_value = old_value;
        self.new_value = new_value;
        self
    }

    pub fn with_device(
        mut self,
        device_id: Option<String>,
        device_fingerprint: Option<String>,
    ) -> Self {
        self.device_id = device_id;
        self.device_fingerprint = device_fingerprint;
        self
    }
}

/// Optional filters for [`Model::search`]. Unset fields match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AuditFilter {
    pub user_id: Option<i64>,
    pub action: Option<AuditAction>,
    pub resource_type: Option<String>,
    pub resource_id: Option<i64>,
    pub class_id: Option<i64>,
    pub session_id: Option<i64>,
    pub status: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl AuditFilter {
    fn condition(&self) -> Condition {
        let mut cond = Condition::all();
        if let Some(user_id) = self.user_id {
            cond = cond.add(Column::UserId.eq(user_id));
        }
        if let Some(action) = self.action {
            cond = cond.add(Column::Action.eq(action));
        }
        if let Some(resource_type) = &self.resource_type {
            cond = cond.add(Column::ResourceType.eq(resource_type.clone()));
        }
        if let Some(resource_id) = self.resource_id {
            cond = cond.add(Column::ResourceId.eq(resource_id));
        }
        if let Some(class_id) = self.class_id {
            cond = cond.add(Column::ClassId.eq(class_id));
        }
        if let Some(session_id) = self.session_id {
            cond = cond.add(Column::SessionId.eq(session_id));
        }
        if let Some(status) = &self.status {
            cond = cond.add(Column::Status.eq(status.clone()));
        }
        if let Some(from) = self.from {
            cond = cond.add(Column::CreatedAt.gte(from));
        }
        if let Some(to) = self.to {
            cond = cond.add(Column::CreatedAt.lte(to));
        }
        cond
    }
}

impl Model {
    pub async fn append<C>(
        db: &C,
        entry: NewAuditEntry,
        now: DateTime<Utc>,
    ) -> Result<Model, DbErr>
    where
        C: ConnectionTrait,
    {
        ActiveModel {
            user_id: Set(entry.user_id),
            action: Set(entry.action),
            resource_type: Set(entry.resource_type),
            resource_id: Set(entry.resource_id),
            class_id: Set(entry.class_id),
            session_id: Set(entry.session_id),
            old_value: Set(entry.old_value),
            new_value: Set(entry.new_value),
            device_id: Set(entry.device_id),
            device_fingerprint: Set(entry.device_fingerprint),
            status: Set("success".to_string()),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// Filtered page of entries, newest first, plus the total match count.
    pub async fn search<C>(
        db: &C,
        filter: &AuditFilter,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<Model>, u64), DbErr>
    where
        C: ConnectionTrait,
    {
        let query = Entity::find().filter(filter.condition());
        let total = query.clone().count(db).await?;
        let page = page.max(1);
        let rows = query
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .offset((page - 1) * per_page)
            .limit(per_page)
            .all(db)
            .await?;
        Ok((rows, total))
    }

    /// Entries for a single resource in the order they were written.
    pub async fn for_resource<C>(
        db: &C,
        resource_type: &str,
        resource_id: i64,
    ) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::ResourceType.eq(resource_type))
            .filter(Column::ResourceId.eq(resource_id))
            .order_by_asc(Column::CreatedAt)
            .order_by_asc(Column::Id)
            .all(db)
            .await
    }

    /// Every matching entry, newest first.
    pub async fn all_matching<C>(db: &C, filter: &AuditFilter) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(filter.condition())
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .all(db)
            .await
    }

    pub async fn count_matching<C>(db: &C, filter: &AuditFilter) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find().filter(filter.condition()).count(db).await
    }

    /// Number of distinct actors among the matching entries.
    pub async fn distinct_users<C>(db: &C, filter: &AuditFilter) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let users: Vec<i64> = Entity::find()
            .select_only()
            .column(Column::UserId)
            .distinct()
            .filter(filter.condition())
            .into_tuple()
            .all(db)
            .await?;
        Ok(users.len() as u64)
    }

    /// `(action, count)` pairs for the matching entries, most frequent first.
    pub async fn action_counts<C>(db: &C, filter: &AuditFilter) -> Result<Vec<(String, i64)>, DbErr>
    where
        C: ConnectionTrait,
    {
        let mut counts: Vec<(String, i64)> = Entity::find()
            .select_only()
            .column(Column::Action)
            .column_as(Expr::col(Column::Id).count(), "count")
            .filter(filter.condition())
            .group_by(Column::Action)
            .into_tuple()
            .all(db)
            .await?;
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        Ok(counts)
    }

    /// Matching entries whose status is not `success`, newest first.
    pub async fn failures<C>(db: &C, filter: &AuditFilter, limit: u64) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(filter.condition())
            .filter(Column::Status.ne("success"))
            .order_by_desc(Column::CreatedAt)
            .order_by_desc(Column::Id)
            .limit(limit)
            .all(db)
            .await
    }

    /// Removes entries written before `cutoff`, returning how many were deleted.
    pub async fn purge_before<C>(db: &C, cutoff: DateTime<Utc>) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let res = Entity::delete_many()
            .filter(Column::CreatedAt.lt(cutoff))
            .exec(db)
            .await?;
        Ok(res.rows_affected)
    }
}
