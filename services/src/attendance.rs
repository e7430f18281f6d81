//! Attendance recording and the lecturer verification workflow.
//!
//! Every read-check-write sequence runs inside one transaction and the
//! `(student_id, session_id)` unique index backs the one-record invariant.
//! Audit entries are appended after commit.

use chrono::{DateTime, Utc};
use db::models::attendance_log::{self, AttendanceStatus};
use db::models::audit_log::NewAuditEntry;
use db::models::{AuditAction, lecturer_verification, session, user};
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait,
    IntoActiveModel, QueryFilter, SqlErr, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::audit::{AuditService, with_device};
use crate::credential::CredentialService;
use crate::device::DeviceContext;
use crate::error::{ServiceError, ServiceResult};

pub const CHECK_IN_METHOD_QR: &str = "qr";

/// One requested status change, as supplied by a lecturer.
#[derive(Debug, Clone, Deserialize)]
pub struct Marking {
    pub student_id: i64,
    pub status: AttendanceStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MarkResult {
    pub attendance: attendance_log::Model,
    /// `true` when the record did not exist before this call.
    pub created: bool,
    pub previous_status: Option<AttendanceStatus>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkItemResult {
    pub student_id: i64,
    pub attendance_id: i64,
    pub status: AttendanceStatus,
    pub created: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkItemError {
    pub student_id: i64,
    pub error: String,
}

/// Per-item report of a bulk marking. `success` is false as soon as one item failed.
#[derive(Debug, Clone, Serialize)]
pub struct BulkMarkOutcome {
    pub success: bool,
    pub processed_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub results: Vec<BulkItemResult>,
    pub errors: Vec<BulkItemError>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CheckInOutcome {
    CheckedIn { attendance_id: i64 },
    AlreadyCheckedIn { attendance_id: i64 },
    Rejected { reason: String },
}

struct VerificationNote<'a> {
    lecturer_id: i64,
    class_id: i64,
    original_status: Option<AttendanceStatus>,
    reason: Option<&'a str>,
    notes: Option<&'a str>,
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

async fn append_verification<C>(
    conn: &C,
    record: &attendance_log::Model,
    note: VerificationNote<'_>,
    device: &DeviceContext,
    now: DateTime<Utc>,
) -> Result<lecturer_verification::Model, DbErr>
where
    C: ConnectionTrait,
{
    lecturer_verification::ActiveModel {
        lecturer_id: Set(note.lecturer_id),
        attendance_id: Set(record.id),
        student_id: Set(record.student_id),
        class_id: Set(note.class_id),
        session_id: Set(record.session_id),
        original_status: Set(note.original_status),
        verified_status: Set(record.status),
        verification_reason: Set(note.reason.map(str::to_owned)),
        verification_notes: Set(note.notes.map(str::to_owned)),
        device_id: Set(device.device_id.clone()),
        device_fingerprint: Set(device.device_fingerprint.clone()),
        verified_at: Set(now),
        ..Default::default()
    }
    .insert(conn)
    .await
}

async fn require_session<C>(conn: &C, class_id: i64, session_id: i64) -> ServiceResult<session::Model>
where
    C: ConnectionTrait,
{
    session::Model::find_in_class(conn, class_id, session_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound("Session not found".into()))
}

#[derive(Clone)]
pub struct AttendanceService {
    db: DatabaseConnection,
    audit: AuditService,
    credentials: CredentialService,
}

impl AttendanceService {
    pub fn new(db: DatabaseConnection, audit: AuditService, credentials: CredentialService) -> Self {
        Self {
            db,
            audit,
            credentials,
        }
    }

    /// Upserts the student's record in one transaction and appends its
    /// verification entry. No audit.
    /// Upserts one marking. A concurrent insert of the same record surfaces as a
    /// unique violation; the marking is then replayed as an update.
    async fn apply_marking(
        &self,
        actor: i64,
        class_id: i64,
        session_id: i64,
        marking: &Marking,
        device: &DeviceContext,
        now: DateTime<Utc>,
    ) -> ServiceResult<MarkResult> {
        match self
            .upsert_marking(actor, class_id, session_id, marking, device, now)
            .await
        {
            Err(ServiceError::Database(e)) if is_unique_violation(&e) => {
                tracing::debug!(
                    session_id,
                    student_id = marking.student_id,
                    "Attendance row appeared concurrently, retrying as update"
                );
                self.upsert_marking(actor, class_id, session_id, marking, device, now)
                    .await
            }
            other => other,
        }
    }

    async fn upsert_marking(
        &self,
        actor: i64,
        class_id: i64,
        session_id: i64,
        marking: &Marking,
        device: &DeviceContext,
        now: DateTime<Utc>,
    ) -> ServiceResult<MarkResult> {
        let txn = self.db.begin().await?;

        if user::Model::find_student(&txn, marking.student_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!(
                "Student {} not found",
                marking.student_id
            )));
        }
        require_session(&txn, class_id, session_id).await?;

        let existing =
            attendance_log::Model::find_for_student(&txn, marking.student_id, session_id).await?;
        let previous_status = existing.as_ref().map(|r| r.status);

        let record = match existing {
            Some(current) => {
                let mut active = current.into_active_model();
                active.status = Set(marking.status);
                active.verified = Set(true);
                active.verified_by = Set(Some(actor));
                active.verification_time = Set(Some(now));
                active.verification_device_id = Set(device.device_id.clone());
                active.verification_notes = Set(marking.notes.clone());
                active.update(&txn).await?
            }
            None => {
                attendance_log::ActiveModel {
                    student_id: Set(marking.student_id),
                    session_id: Set(session_id),
                    status: Set(marking.status),
                    verified: Set(true),
                    verified_by: Set(Some(actor)),
                    verification_time: Set(Some(now)),
                    verification_device_id: Set(device.device_id.clone()),
                    verification_notes: Set(marking.notes.clone()),
                    ..Default::default()
                }
                .insert(&txn)
                .await?
            }
        };

        append_verification(
            &txn,
            &record,
            VerificationNote {
                lecturer_id: actor,
                class_id,
                original_status: previous_status,
                reason: marking.reason.as_deref(),
                notes: marking.notes.as_deref(),
            },
            device,
            now,
        )
        .await?;
        txn.commit().await?;

        Ok(MarkResult {
            attendance: record,
            created: previous_status.is_none(),
            previous_status,
        })
    }

    pub async fn mark(
        &self,
        actor: i64,
        class_id: i64,
        session_id: i64,
        marking: Marking,
        device: &DeviceContext,
    ) -> ServiceResult<MarkResult> {
        let now = Utc::now();
        let result = self
            .apply_marking(actor, class_id, session_id, &marking, device, now)
            .await?;

        let (action, old_value) = match result.previous_status {
            None => (AuditAction::AttendanceCreated, None),
            Some(prev) => (AuditAction::AttendanceMarked, Some(json!({ "status": prev }))),
        };
        tracing::info!(
            actor,
            class_id,
            session_id,
            student_id = marking.student_id,
            status = %marking.status,
            created = result.created,
            "Attendance marked"
        );
        let entry = NewAuditEntry::new(actor, action, "attendance", result.attendance.id)
            .scoped(class_id, Some(session_id))
            .with_values(
                old_value,
                Some(json!({ "status": marking.status, "reason": marking.reason })),
            );
        self.audit.record_at(with_device(entry, device), now).await;

        Ok(result)
    }

    /// Applies each marking independently; one failing item never stops the rest.
    pub async fn bulk_mark(
        &self,
        actor: i64,
        class_id: i64,
        session_id: i64,
        markings: Vec<Marking>,
        device: &DeviceContext,
    ) -> ServiceResult<BulkMarkOutcome> {
        if markings.is_empty() {
            return Err(ServiceError::Validation(
                "At least one attendance record is required".into(),
            ));
        }
        let now = Utc::now();
        let mut results = Vec::new();
        let mut errors = Vec::new();

        for marking in &markings {
            match self
                .apply_marking(actor, class_id, session_id, marking, device, now)
                .await
            {
                Ok(r) => results.push(BulkItemResult {
                    student_id: marking.student_id,
                    attendance_id: r.attendance.id,
                    status: r.attendance.status,
                    created: r.created,
                }),
                Err(e) => {
                    tracing::warn!(
                        actor,
                        session_id,
                        student_id = marking.student_id,
                        error = %e,
                        "Bulk attendance item failed"
                    );
                    errors.push(BulkItemError {
                        student_id: marking.student_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        let outcome = BulkMarkOutcome {
            success: errors.is_empty(),
            processed_count: markings.len(),
            success_count: results.len(),
            failure_count: errors.len(),
            results,
            errors,
        };

        tracing::info!(
            actor,
            class_id,
            session_id,
            processed = outcome.processed_count,
            failed = outcome.failure_count,
            "Bulk attendance processed"
        );
        let entry = NewAuditEntry::new(
            actor,
            AuditAction::BulkAttendanceMarked,
            "attendance_batch",
            session_id,
        )
        .scoped(class_id, Some(session_id))
        .with_values(
            None,
            Some(json!({
                "count": outcome.processed_count,
                "successful": outcome.success_count,
                "failed": outcome.failure_count,
            })),
        );
        self.audit.record_at(with_device(entry, device), now).await;

        Ok(outcome)
    }

    /// Marks an existing record as trusted. The status itself is untouched.
    #[allow(clippy::too_many_arguments)]
    pub async fn verify(
        &self,
        actor: i64,
        class_id: i64,
        session_id: i64,
        student_id: i64,
        attendance_id: i64,
        reason: Option<String>,
        notes: Option<String>,
        device: &DeviceContext,
    ) -> ServiceResult<attendance_log::Model> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        require_session(&txn, class_id, session_id).await?;
        let record = attendance_log::Entity::find_by_id(attendance_id)
            .filter(attendance_log::Column::StudentId.eq(student_id))
            .filter(attendance_log::Column::SessionId.eq(session_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Attendance record not found".into()))?;
        let was_verified = record.verified;

        let mut active = record.into_active_model();
        active.verified = Set(true);
        active.verified_by = Set(Some(actor));
        active.verification_time = Set(Some(now));
        active.verification_device_id = Set(device.device_id.clone());
        active.verification_notes = Set(notes.clone());
        let updated = active.update(&txn).await?;

        append_verification(
            &txn,
            &updated,
            VerificationNote {
                lecturer_id: actor,
                class_id,
                original_status: Some(updated.status),
                reason: reason.as_deref(),
                notes: notes.as_deref(),
            },
            device,
            now,
        )
        .await?;
        txn.commit().await?;

        tracing::info!(actor, class_id, session_id, attendance_id, "Attendance verified");
        let entry = NewAuditEntry::new(actor, AuditAction::AttendanceVerified, "attendance", attendance_id)
            .scoped(class_id, Some(session_id))
            .with_values(
                Some(json!({ "verified": was_verified })),
                Some(json!({ "verified": true, "reason": reason })),
            );
        self.audit.record_at(with_device(entry, device), now).await;

        Ok(updated)
    }

    /// Withdraws trust from a record, keeping its status. The reason is kept
    /// as the record's verification notes.
    pub async fn unverify(
        &self,
        actor: i64,
        attendance_id: i64,
        class_id: i64,
        session_id: i64,
        reason: Option<String>,
        device: &DeviceContext,
    ) -> ServiceResult<attendance_log::Model> {
        let now = Utc::now();
        let txn = self.db.begin().await?;

        require_session(&txn, class_id, session_id).await?;
        let record = attendance_log::Entity::find_by_id(attendance_id)
            .filter(attendance_log::Column::SessionId.eq(session_id))
            .one(&txn)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Attendance record not found".into()))?;
        let was_verified = record.verified;

        let mut active = record.into_active_model();
        active.verified = Set(false);
        active.verified_by = Set(None);
        active.verification_time = Set(None);
        active.verification_device_id = Set(None);
        active.verification_notes = Set(reason.clone());
        let updated = active.update(&txn).await?;

        append_verification(
            &txn,
            &updated,
            VerificationNote {
                lecturer_id: actor,
                class_id,
                original_status: Some(updated.status),
                reason: reason.as_deref(),
                notes: None,
            },
            device,
            now,
        )
        .await?;
        txn.commit().await?;

        tracing::info!(actor, class_id, session_id, attendance_id, "Attendance unverified");
        let entry = NewAuditEntry::new(actor, AuditAction::AttendanceUnverified, "attendance", attendance_id)
            .scoped(class_id, Some(session_id))
            .with_values(
                Some(json!({ "verified": was_verified })),
                Some(json!({ "verified": false, "reason": reason })),
            );
        self.audit.record_at(with_device(entry, device), now).await;

        Ok(updated)
    }

    /// Student-facing check-in: validates the presented credential and records
    /// the student as present, unverified.
    pub async fn check_in(
        &self,
        student_id: i64,
        token: &str,
        signature: &str,
        session_id: i64,
        class_id: i64,
        device: &DeviceContext,
    ) -> ServiceResult<CheckInOutcome> {
        self.check_in_at(student_id, token, signature, session_id, class_id, device, Utc::now())
            .await
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn check_in_at(
        &self,
        student_id: i64,
        token: &str,
        signature: &str,
        session_id: i64,
        class_id: i64,
        device: &DeviceContext,
        now: DateTime<Utc>,
    ) -> ServiceResult<CheckInOutcome> {
        let txn = self.db.begin().await?;

        if user::Model::find_student(&txn, student_id).await?.is_none() {
            return Err(ServiceError::NotFound("Student not found".into()));
        }

        // A forged or expired credential is rejected even for a student who is
        // already recorded.
        let validation = self
            .credentials
            .validate_on(&txn, token, signature, session_id, class_id, now)
            .await?;
        let Some(credential_id) = validation.credential_id.filter(|_| validation.valid) else {
            let reason = validation
                .reason
                .unwrap_or_else(|| "Credential rejected".to_owned());
            return Ok(CheckInOutcome::Rejected { reason });
        };

        if let Some(existing) =
            attendance_log::Model::find_for_student(&txn, student_id, session_id).await?
        {
            txn.commit().await?;
            return Ok(CheckInOutcome::AlreadyCheckedIn {
                attendance_id: existing.id,
            });
        }

        let inserted = attendance_log::ActiveModel {
            student_id: Set(student_id),
            session_id: Set(session_id),
            status: Set(AttendanceStatus::Present),
            verified: Set(false),
            check_in_time: Set(Some(now)),
            check_in_method: Set(Some(CHECK_IN_METHOD_QR.to_owned())),
            credential_id: Set(Some(credential_id)),
            ..Default::default()
        }
        .insert(&txn)
        .await;

        let record = match inserted {
            Ok(record) => record,
            Err(e) if is_unique_violation(&e) => {
                drop(txn);
                let existing = attendance_log::Model::find_for_student(&self.db, student_id, session_id)
                    .await?
                    .ok_or(ServiceError::Database(e))?;
                return Ok(CheckInOutcome::AlreadyCheckedIn {
                    attendance_id: existing.id,
                });
            }
            Err(e) => return Err(e.into()),
        };
        txn.commit().await?;

        tracing::info!(student_id, class_id, session_id, credential_id, "Student checked in");
        let entry = NewAuditEntry::new(student_id, AuditAction::AttendanceCheckedIn, "attendance", record.id)
            .scoped(class_id, Some(session_id))
            .with_values(
                None,
                Some(json!({
                    "status": AttendanceStatus::Present,
                    "check_in_method": CHECK_IN_METHOD_QR,
                    "credential_id": credential_id,
                })),
            );
        self.audit.record_at(with_device(entry, device), now).await;

        Ok(CheckInOutcome::CheckedIn {
            attendance_id: record.id,
        })
    }
}
