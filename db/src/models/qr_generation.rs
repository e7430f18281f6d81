//! Issued check-in credentials. Rows form an append-only history per session;
//! only `scanned_count`, `is_rotated` and (on revocation) `expires_at` change.

use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{QueryOrder, QuerySelect};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "qr_generations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub session_id: i64,
    pub class_id: i64,
    pub qr_token: String,
    pub qr_signature: String,
    pub generated_by: i64,
    pub generated_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub scanned_count: i64,
    /// Set once a newer credential has been rotated in after this one.
    pub is_rotated: bool,
    pub rotation_index: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::session::Entity",
        from = "Column::SessionId",
        to = "super::session::Column::Id",
        on_delete = "Cascade"
    )]
    Session,
}

impl Related<super::session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Most recently generated credential of the session that is still unexpired at `now`.
    pub async fn latest_active<C>(
        db: &C,
        class_id: i64,
        session_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::ClassId.eq(class_id))
            .filter(Column::ExpiresAt.gt(now))
            .order_by_desc(Column::GeneratedAt)
            .order_by_desc(Column::Id)
            .one(db)
            .await
    }

    /// Index for the next credential of the session: one past the highest
    /// ever issued, or 0 for the first.
    pub async fn next_rotation_index<C>(db: &C, session_id: i64) -> Result<i32, DbErr>
    where
        C: ConnectionTrait,
    {
        let highest = Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .order_by_desc(Column::RotationIndex)
            .one(db)
            .await?;
        Ok(highest.map_or(0, |row| row.rotation_index + 1))
    }

    /// Generation history, newest first.
    pub async fn history<C>(
        db: &C,
        class_id: i64,
        session_id: i64,
        limit: u64,
    ) -> Result<Vec<Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::ClassId.eq(class_id))
            .order_by_desc(Column::GeneratedAt)
            .order_by_desc(Column::Id)
            .limit(limit)
            .all(db)
            .await
    }
}
