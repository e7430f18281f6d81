//! Session lifecycle transitions.
//!
//! Each transition is a single conditional `UPDATE` guarded on the session's
//! current status, so concurrent callers cannot both win. When nothing
//! matched, one read classifies the failure.

use chrono::{Duration, Utc};
use db::models::audit_log::NewAuditEntry;
use db::models::session::{self, Column, Entity as SessionEntity, SessionStatus};
use db::models::AuditAction;
use rand::distributions::Alphanumeric;
use rand::Rng;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, Condition, DatabaseConnection, EntityTrait, Iterable, QueryFilter};
use serde_json::json;

use crate::audit::{AuditService, with_device};
use crate::device::DeviceContext;
use crate::error::{ServiceError, ServiceResult};

const SESSION_TOKEN_LEN: usize = 32;

fn generate_session_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(SESSION_TOKEN_LEN)
        .map(char::from)
        .collect()
}

fn not_terminal() -> Condition {
    Condition::all().add(Column::Status.is_not_in(SessionStatus::iter().filter(|s| s.is_terminal())))
}

#[derive(Clone)]
pub struct SessionService {
    db: DatabaseConnection,
    audit: AuditService,
}

impl SessionService {
    pub fn new(db: DatabaseConnection, audit: AuditService) -> Self {
        Self { db, audit }
    }

    /// Full session row, scoped to its class.
    pub async fn get_state(&self, class_id: i64, session_id: i64) -> ServiceResult<session::Model> {
        session::Model::find_in_class(&self.db, class_id, session_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Session not found".into()))
    }

    pub async fn start(
        &self,
        class_id: i64,
        session_id: i64,
        actor: i64,
        device: &DeviceContext,
    ) -> ServiceResult<session::Model> {
        let before = self.get_state(class_id, session_id).await?;
        let now = Utc::now();
        let token = generate_session_token();

        let res = SessionEntity::update_many()
            .col_expr(Column::Status, Expr::value(SessionStatus::InProgress))
            .col_expr(Column::ScanningEnabled, Expr::value(true))
            .col_expr(Column::SessionToken, Expr::value(Some(token.clone())))
            .col_expr(Column::StartedBy, Expr::value(Some(actor)))
            .col_expr(Column::StartedAt, Expr::value(Some(now)))
            .filter(Column::Id.eq(session_id))
            .filter(Column::ClassId.eq(class_id))
            .filter(Column::Status.eq(SessionStatus::Scheduled))
            .exec(&self.db)
            .await?;

        if res.rows_affected == 0 {
            return Err(ServiceError::NotFound(
                "Session not found or already started".into(),
            ));
        }

        tracing::info!(class_id, session_id, actor, "Session started");
        let entry = NewAuditEntry::new(actor, AuditAction::SessionStarted, "session", session_id)
            .scoped(class_id, Some(session_id))
            .with_values(
                Some(json!({
                    "status": before.status,
                    "scanning_enabled": before.scanning_enabled,
                })),
                Some(json!({
                    "status": SessionStatus::InProgress,
                    "scanning_enabled": true,
                    "session_token": token,
                    "started_at": now,
                })),
            );
        self.audit.record_at(with_device(entry, device), now).await;

        self.get_state(class_id, session_id).await
    }

    /// Records a delay; `new_start_time = now + delay_minutes`. Status is unchanged.
    pub async fn delay(
        &self,
        class_id: i64,
        session_id: i64,
        actor: i64,
        delay_minutes: i64,
        reason: &str,
        device: &DeviceContext,
    ) -> ServiceResult<session::Model> {
        if delay_minutes <= 0 {
            return Err(ServiceError::Validation(
                "Delay minutes must be greater than zero".into(),
            ));
        }
        let before = self.get_state(class_id, session_id).await?;
        let now = Utc::now();
        let new_start = now + Duration::minutes(delay_minutes);

        self.guarded_update(
            class_id,
            session_id,
            SessionEntity::update_many()
                .col_expr(Column::DelayedBy, Expr::value(Some(actor)))
                .col_expr(Column::DelayReason, Expr::value(Some(reason.to_owned())))
                .col_expr(Column::DelayedAt, Expr::value(Some(now)))
                .col_expr(Column::NewStartTime, Expr::value(Some(new_start))),
        )
        .await?;

        tracing::info!(class_id, session_id, actor, delay_minutes, "Session delayed");
        let entry = NewAuditEntry::new(actor, AuditAction::SessionDelayed, "session", session_id)
            .scoped(class_id, Some(session_id))
            .with_values(
                Some(json!({
                    "delay_reason": before.delay_reason,
                    "new_start_time": before.new_start_time,
                })),
                Some(json!({
                    "delay_minutes": delay_minutes,
                    "delay_reason": reason,
                    "new_start_time": new_start,
                })),
            );
        self.audit.record_at(with_device(entry, device), now).await;

        self.get_state(class_id, session_id).await
    }

    /// Terminal: `status = cancelled`, scanning off.
    pub async fn cancel(
        &self,
        class_id: i64,
        session_id: i64,
        actor: i64,
        reason: &str,
        device: &DeviceContext,
    ) -> ServiceResult<session::Model> {
        let before = self.get_state(class_id, session_id).await?;
        let now = Utc::now();

        self.guarded_update(
            class_id,
            session_id,
            SessionEntity::update_many()
                .col_expr(Column::Status, Expr::value(SessionStatus::Cancelled))
                .col_expr(Column::ScanningEnabled, Expr::value(false))
                .col_expr(Column::CancelledBy, Expr::value(Some(actor)))
                .col_expr(Column::CancellationReason, Expr::value(Some(reason.to_owned())))
                .col_expr(Column::CancelledAt, Expr::value(Some(now))),
        )
        .await?;

        tracing::info!(class_id, session_id, actor, "Session cancelled");
        let entry = NewAuditEntry::new(actor, AuditAction::SessionCancelled, "session", session_id)
            .scoped(class_id, Some(session_id))
            .with_values(
                Some(json!({
                    "status": before.status,
                    "scanning_enabled": before.scanning_enabled,
                })),
                Some(json!({
                    "status": SessionStatus::Cancelled,
                    "scanning_enabled": false,
                    "cancellation_reason": reason,
                })),
            );
        self.audit.record_at(with_device(entry, device), now).await;

        self.get_state(class_id, session_id).await
    }

    pub async fn change_room(
        &self,
        class_id: i64,
        session_id: i64,
        actor: i64,
        new_room: &str,
        old_room: &str,
        device: &DeviceContext,
    ) -> ServiceResult<session::Model> {
        if new_room.trim().is_empty() {
            return Err(ServiceError::Validation("New room must not be empty".into()));
        }
        let before = self.get_state(class_id, session_id).await?;
        let now = Utc::now();

        self.guarded_update(
            class_id,
            session_id,
            SessionEntity::update_many()
                .col_expr(Column::RoomChangeFrom, Expr::value(Some(old_room.to_owned())))
                .col_expr(Column::RoomChangeTo, Expr::value(Some(new_room.to_owned())))
                .col_expr(Column::RoomChangedBy, Expr::value(Some(actor)))
                .col_expr(Column::RoomChangedAt, Expr::value(Some(now))),
        )
        .await?;

        tracing::info!(class_id, session_id, actor, new_room, "Session room changed");
        let previous_room = before
            .room_change_to
            .clone()
            .unwrap_or_else(|| old_room.to_owned());
        let entry = NewAuditEntry::new(actor, AuditAction::RoomChanged, "session", session_id)
            .scoped(class_id, Some(session_id))
            .with_values(
                Some(json!({ "room": previous_room })),
                Some(json!({ "room": new_room, "room_change_from": old_room })),
            );
        self.audit.record_at(with_device(entry, device), now).await;

        self.get_state(class_id, session_id).await
    }

    /// Pauses or resumes credential issuance. Repeating the same value still
    /// writes a fresh audit entry.
    pub async fn toggle_scanning(
        &self,
        class_id: i64,
        session_id: i64,
        actor: i64,
        enabled: bool,
        device: &DeviceContext,
    ) -> ServiceResult<session::Model> {
        let before = self.get_state(class_id, session_id).await?;
        let now = Utc::now();

        self.guarded_update(
            class_id,
            session_id,
            SessionEntity::update_many().col_expr(Column::ScanningEnabled, Expr::value(enabled)),
        )
        .await?;

        let action = if enabled {
            AuditAction::ScanningEnabled
        } else {
            AuditAction::ScanningDisabled
        };
        tracing::info!(class_id, session_id, actor, enabled, "Session scanning toggled");
        let entry = NewAuditEntry::new(actor, action, "session", session_id)
            .scoped(class_id, Some(session_id))
            .with_values(
                Some(json!({ "scanning_enabled": before.scanning_enabled })),
                Some(json!({ "scanning_enabled": enabled })),
            );
        self.audit.record_at(with_device(entry, device), now).await;

        self.get_state(class_id, session_id).await
    }

    /// Runs `update` restricted to a non-terminal session of the class.
    async fn guarded_update(
        &self,
        class_id: i64,
        session_id: i64,
        update: sea_orm::UpdateMany<SessionEntity>,
    ) -> ServiceResult<()> {
        let res = update
            .filter(Column::Id.eq(session_id))
            .filter(Column::ClassId.eq(class_id))
            .filter(not_terminal())
            .exec(&self.db)
            .await?;

        if res.rows_affected > 0 {
            return Ok(());
        }
        match session::Model::find_in_class(&self.db, class_id, session_id).await? {
            Some(s) => Err(ServiceError::InvalidTransition(format!(
                "Session is {} and can no longer change",
                s.status
            ))),
            None => Err(ServiceError::NotFound("Session not found".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Fixture;
    use db::models::audit_log;
    use sea_orm::QueryOrder;

    async fn audit_actions(fx: &Fixture) -> Vec<AuditAction> {
        audit_log::Entity::find()
            .filter(audit_log::Column::ResourceType.eq("session"))
            .filter(audit_log::Column::ResourceId.eq(fx.session.id))
            .order_by_asc(audit_log::Column::Id)
            .all(&fx.db)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.action)
            .collect()
    }

    #[tokio::test]
    async fn start_opens_session_for_scanning() {
        let fx = Fixture::new().await;
        let svc = fx.core.sessions.clone();

        let s = svc
            .start(fx.class.id, fx.session.id, fx.lecturer.id, &fx.device)
            .await
            .unwrap();
        assert_eq!(s.status, SessionStatus::InProgress);
        assert!(s.scanning_enabled);
        assert_eq!(s.started_by, Some(fx.lecturer.id));
        assert_eq!(s.session_token.as_deref().map(str::len), Some(SESSION_TOKEN_LEN));
        assert_eq!(audit_actions(&fx).await, vec![AuditAction::SessionStarted]);
    }

    #[tokio::test]
    async fn start_snapshots_the_row_it_replaced() {
        let fx = Fixture::new().await;
        let svc = &fx.core.sessions;
        svc.toggle_scanning(fx.class.id, fx.session.id, fx.lecturer.id, true, &fx.device)
            .await
            .unwrap();
        svc.start(fx.class.id, fx.session.id, fx.lecturer.id, &fx.device)
            .await
            .unwrap();

        let entry = audit_log::Entity::find()
            .filter(audit_log::Column::Action.eq(AuditAction::SessionStarted))
            .one(&fx.db)
            .await
            .unwrap()
            .unwrap();
        let old = entry.old_value.unwrap();
        assert_eq!(old["status"], "scheduled");
        assert_eq!(old["scanning_enabled"], true);
    }

    #[tokio::test]
    async fn start_twice_is_not_found() {
        let fx = Fixture::started().await;
        let err = fx
            .core
            .sessions
            .start(fx.class.id, fx.session.id, fx.lecturer.id, &fx.device)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn start_in_wrong_class_is_not_found() {
        let fx = Fixture::new().await;
        let err = fx
            .core
            .sessions
            .start(fx.class.id + 100, fx.session.id, fx.lecturer.id, &fx.device)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn delay_records_metadata_without_changing_status() {
        let fx = Fixture::started().await;
        let before = Utc::now();
        let s = fx
            .core
            .sessions
            .delay(fx.class.id, fx.session.id, fx.lecturer.id, 15, "Traffic", &fx.device)
            .await
            .unwrap();

        assert_eq!(s.status, SessionStatus::InProgress);
        assert_eq!(s.delay_reason.as_deref(), Some("Traffic"));
        let new_start = s.new_start_time.unwrap();
        assert!(new_start >= before + Duration::minutes(15));
        assert!(new_start <= Utc::now() + Duration::minutes(15));
    }

    #[tokio::test]
    async fn delay_rejects_non_positive_minutes() {
        let fx = Fixture::started().await;
        let err = fx
            .core
            .sessions
            .delay(fx.class.id, fx.session.id, fx.lecturer.id, 0, "x", &fx.device)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[tokio::test]
    async fn delay_on_missing_session_is_not_found() {
        let fx = Fixture::started().await;
        let err = fx
            .core
            .sessions
            .delay(fx.class.id, 9999, fx.lecturer.id, 5, "x", &fx.device)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::NotFound(_)));
    }

    #[tokio::test]
    async fn cancel_is_terminal() {
        let fx = Fixture::started().await;
        let svc = &fx.core.sessions;
        let s = svc
            .cancel(fx.class.id, fx.session.id, fx.lecturer.id, "Strike", &fx.device)
            .await
            .unwrap();
        assert_eq!(s.status, SessionStatus::Cancelled);
        assert!(!s.scanning_enabled);

        let err = svc
            .toggle_scanning(fx.class.id, fx.session.id, fx.lecturer.id, true, &fx.device)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition(_)));
        let err = svc
            .cancel(fx.class.id, fx.session.id, fx.lecturer.id, "again", &fx.device)
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::InvalidTransition(_)));
    }

    #[tokio::test]
    async fn change_room_keeps_scanning_and_audits_both_rooms() {
        let fx = Fixture::started().await;
        let s = fx
            .core
            .sessions
            .change_room(fx.class.id, fx.session.id, fx.lecturer.id, "B-201", "A-101", &fx.device)
            .await
            .unwrap();
        assert!(s.scanning_enabled);
        assert_eq!(s.room_change_from.as_deref(), Some("A-101"));
        assert_eq!(s.room_change_to.as_deref(), Some("B-201"));

        let entry = audit_log::Entity::find()
            .filter(audit_log::Column::Action.eq(AuditAction::RoomChanged))
            .one(&fx.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(entry.old_value.unwrap()["room"], "A-101");
        assert_eq!(entry.new_value.unwrap()["room"], "B-201");
        assert_eq!(entry.device_id.as_deref(), Some("device-1"));
    }

    #[tokio::test]
    async fn toggle_scanning_twice_writes_two_entries() {
        let fx = Fixture::started().await;
        let svc = &fx.core.sessions;
        for _ in 0..2 {
            let s = svc
                .toggle_scanning(fx.class.id, fx.session.id, fx.lecturer.id, true, &fx.device)
                .await
                .unwrap();
            assert!(s.scanning_enabled);
        }
        assert_eq!(
            audit_actions(&fx).await,
            vec![
                AuditAction::SessionStarted,
                AuditAction::ScanningEnabled,
                AuditAction::ScanningEnabled
            ]
        );
    }
}
