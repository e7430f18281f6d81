//! Check-in credential issuing, rotation and validation.
//!
//! A credential is a random token plus an HMAC-SHA256 signature over
//! `token:session_id:class_id`. It is presentable while unexpired and while its
//! session is in progress with scanning enabled.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use db::models::audit_log::NewAuditEntry;
use db::models::qr_generation::{self, Column, Entity as CredentialEntity};
use db::models::session::{self, SessionStatus};
use db::models::{AuditAction, class};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sea_orm::ActiveValue::Set;
use sea_orm::sea_query::{Expr, Query};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QuerySelect, RelationTrait, TransactionTrait,
};
use serde::Serialize;
use serde_json::json;
use sha2::Sha256;

use crate::audit::{AuditService, with_device};
use crate::device::DeviceContext;
use crate::error::{ServiceError, ServiceResult};

type HmacSha256 = Hmac<Sha256>;

pub const REASON_INVALID_SIGNATURE: &str = "Invalid signature";
pub const REASON_NOT_FOUND_OR_EXPIRED: &str = "QR token not found or expired";
pub const REASON_NOT_ACCEPTING: &str = "Session is not accepting scans";

const HISTORY_MAX: u64 = 100;

/// Computes and checks credential signatures with the process-wide secret.
#[derive(Clone)]
pub struct CredentialSigner {
    key: Vec<u8>,
}

impl fmt::Debug for CredentialSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialSigner").finish_non_exhaustive()
    }
}

impl CredentialSigner {
    pub fn new(secret: impl AsRef<[u8]>) -> Self {
        Self {
            key: secret.as_ref().to_vec(),
        }
    }

    fn mac(&self, token: &str, session_id: i64, class_id: i64) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.key).expect("HMAC key");
        mac.update(format!("{token}:{session_id}:{class_id}").as_bytes());
        mac
    }

    /// Lowercase hex signature for `(token, session_id, class_id)`.
    pub fn sign(&self, token: &str, session_id: i64, class_id: i64) -> String {
        hex::encode(self.mac(token, session_id, class_id).finalize().into_bytes())
    }

    /// Constant-time comparison against a presented hex signature.
    pub fn verify(&self, token: &str, signature: &str, session_id: i64, class_id: i64) -> bool {
        let Ok(presented) = hex::decode(signature.trim()) else {
            return false;
        };
        self.mac(token, session_id, class_id)
            .verify_slice(&presented)
            .is_ok()
    }
}

fn generate_token() -> String {
    let mut buf = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut buf);
    hex::encode(buf)
}

/// What a client renders as a scannable code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialPayload {
    pub credential_id: i64,
    pub token: String,
    pub signature: String,
    pub session_id: i64,
    pub class_id: i64,
    pub expires_at: DateTime<Utc>,
    pub rotation_index: i32,
}

impl From<qr_generation::Model> for CredentialPayload {
    fn from(m: qr_generation::Model) -> Self {
        Self {
            credential_id: m.id,
            token: m.qr_token,
            signature: m.qr_signature,
            session_id: m.session_id,
            class_id: m.class_id,
            expires_at: m.expires_at,
            rotation_index: m.rotation_index,
        }
    }
}

/// Outcome of presenting a credential. A rejection is a value, not an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CredentialValidation {
    pub valid: bool,
    pub reason: Option<String>,
    pub credential_id: Option<i64>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CredentialValidation {
    fn accepted(credential_id: i64, expires_at: DateTime<Utc>) -> Self {
        Self {
            valid: true,
            reason: None,
            credential_id: Some(credential_id),
            expires_at: Some(expires_at),
        }
    }

    fn rejected(reason: &str) -> Self {
        Self {
            valid: false,
            reason: Some(reason.to_owned()),
            credential_id: None,
            expires_at: None,
        }
    }
}

#[derive(Clone)]
pub struct CredentialService {
    db: DatabaseConnection,
    audit: AuditService,
    signer: CredentialSigner,
    validity: Duration,
}

impl CredentialService {
    /// `validity` is the lifetime given to every credential minted by Issue and
    /// Rotate unless a caller overrides it.
    pub fn new(
        db: DatabaseConnection,
        audit: AuditService,
        signer: CredentialSigner,
        validity: Duration,
    ) -> Self {
        Self {
            db,
            audit,
            signer,
            validity,
        }
    }

    pub fn signer(&self) -> &CredentialSigner {
        &self.signer
    }

    /// The session matching `(session_id, class_id)` owned by `lecturer_id`,
    /// provided it is currently accepting scans.
    async fn eligible_session<C>(
        conn: &C,
        class_id: i64,
        session_id: i64,
        lecturer_id: i64,
    ) -> ServiceResult<session::Model>
    where
        C: ConnectionTrait,
    {
        let found = session::Entity::find_by_id(session_id)
            .filter(session::Column::ClassId.eq(class_id))
            .join(
                sea_orm::JoinType::InnerJoin,
                session::Relation::Class.def(),
            )
            .filter(class::Column::LecturerId.eq(lecturer_id))
            .one(conn)
            .await?;

        match found {
            None => Err(ServiceError::SessionNotEligible(
                "Session not found or access denied".into(),
            )),
            Some(s) if !s.is_accepting_scans() => Err(ServiceError::SessionNotEligible(
                "Session must be in progress with scanning enabled".into(),
            )),
            Some(s) => Ok(s),
        }
    }

    async fn insert_credential<C>(
        &self,
        conn: &C,
        class_id: i64,
        session_id: i64,
        lecturer_id: i64,
        rotation_index: i32,
        now: DateTime<Utc>,
        validity: Duration,
    ) -> ServiceResult<qr_generation::Model>
    where
        C: ConnectionTrait,
    {
        let token = generate_token();
        let signature = self.signer.sign(&token, session_id, class_id);
        let row = qr_generation::ActiveModel {
            session_id: Set(session_id),
            class_id: Set(class_id),
            qr_token: Set(token),
            qr_signature: Set(signature),
            generated_by: Set(lecturer_id),
            generated_at: Set(now),
            expires_at: Set(now + validity),
            scanned_count: Set(0),
            is_rotated: Set(false),
            rotation_index: Set(rotation_index),
            ..Default::default()
        }
        .insert(conn)
        .await?;
        Ok(row)
    }

    pub async fn issue(
        &self,
        class_id: i64,
        session_id: i64,
        lecturer_id: i64,
        validity_seconds: Option<i64>,
        device: &DeviceContext,
    ) -> ServiceResult<CredentialPayload> {
        self.issue_at(class_id, session_id, lecturer_id, validity_seconds, device, Utc::now())
            .await
    }

    pub async fn issue_at(
        &self,
        class_id: i64,
        session_id: i64,
        lecturer_id: i64,
        validity_seconds: Option<i64>,
        device: &DeviceContext,
        now: DateTime<Utc>,
    ) -> ServiceResult<CredentialPayload> {
        let validity = match validity_seconds {
            Some(secs) if secs <= 0 => {
                return Err(ServiceError::Validation(
                    "Validity must be a positive number of seconds".into(),
                ));
            }
            Some(secs) => Duration::try_seconds(secs)
                .filter(|span| now.checked_add_signed(*span).is_some())
                .ok_or_else(|| {
                    ServiceError::Validation(format!("Validity of {secs} seconds is out of range"))
                })?,
            None => self.validity,
        };

        let txn = self.db.begin().await?;
        Self::eligible_session(&txn, class_id, session_id, lecturer_id).await?;
        let rotation_index = qr_generation::Model::next_rotation_index(&txn, session_id).await?;
        let row = self
            .insert_credential(&txn, class_id, session_id, lecturer_id, rotation_index, now, validity)
            .await?;
        txn.commit().await?;

        tracing::info!(class_id, session_id, lecturer_id, credential_id = row.id, "QR credential issued");
        let entry = NewAuditEntry::new(lecturer_id, AuditAction::QrGenerated, "qr_generation", row.id)
            .scoped(class_id, Some(session_id))
            .with_values(
                None,
                Some(json!({
                    "rotation_index": row.rotation_index,
                    "expires_at": row.expires_at,
                })),
            );
        self.audit.record_at(with_device(entry, device), now).await;

        Ok(row.into())
    }

    /// Mints the successor of the session's live credential. The predecessor is
    /// flagged `is_rotated` but stays presentable until its own expiry.
    pub async fn rotate(
        &self,
        class_id: i64,
        session_id: i64,
        lecturer_id: i64,
        device: &DeviceContext,
    ) -> ServiceResult<CredentialPayload> {
        self.rotate_at(class_id, session_id, lecturer_id, device, Utc::now())
            .await
    }

    pub async fn rotate_at(
        &self,
        class_id: i64,
        session_id: i64,
        lecturer_id: i64,
        device: &DeviceContext,
        now: DateTime<Utc>,
    ) -> ServiceResult<CredentialPayload> {
        let txn = self.db.begin().await?;
        Self::eligible_session(&txn, class_id, session_id, lecturer_id).await?;

        let previous = qr_generation::Model::latest_active(&txn, class_id, session_id, now)
            .await?
            .ok_or(ServiceError::NoActiveCredential)?;

        let rotation_index = qr_generation::Model::next_rotation_index(&txn, session_id).await?;
        let row = self
            .insert_credential(
                &txn,
                class_id,
                session_id,
                lecturer_id,
                rotation_index,
                now,
                self.validity,
            )
            .await?;

        CredentialEntity::update_many()
            .col_expr(Column::IsRotated, Expr::value(true))
            .filter(Column::Id.eq(previous.id))
            .exec(&txn)
            .await?;
        txn.commit().await?;

        tracing::info!(
            class_id,
            session_id,
            lecturer_id,
            credential_id = row.id,
            rotation_index = row.rotation_index,
            "QR credential rotated"
        );
        let entry = NewAuditEntry::new(lecturer_id, AuditAction::QrRotated, "qr_generation", row.id)
            .scoped(class_id, Some(session_id))
            .with_values(
                Some(json!({
                    "credential_id": previous.id,
                    "rotation_index": previous.rotation_index,
                    "expires_at": previous.expires_at,
                })),
                Some(json!({
                    "credential_id": row.id,
                    "rotation_index": row.rotation_index,
                    "expires_at": row.expires_at,
                })),
            );
        self.audit.record_at(with_device(entry, device), now).await;

        Ok(row.into())
    }

    /// Expires every live credential of the session immediately.
    pub async fn revoke(
        &self,
        class_id: i64,
        session_id: i64,
        lecturer_id: i64,
        device: &DeviceContext,
    ) -> ServiceResult<u64> {
        self.revoke_at(class_id, session_id, lecturer_id, device, Utc::now())
            .await
    }

    pub async fn revoke_at(
        &self,
        class_id: i64,
        session_id: i64,
        lecturer_id: i64,
        device: &DeviceContext,
        now: DateTime<Utc>,
    ) -> ServiceResult<u64> {
        let owned = class::Model::is_lecturer_of(&self.db, class_id, lecturer_id).await?
            && session::Model::find_in_class(&self.db, class_id, session_id)
                .await?
                .is_some();
        if !owned {
            return Err(ServiceError::NotFound(
                "Session not found or access denied".into(),
            ));
        }

        let res = CredentialEntity::update_many()
            .col_expr(Column::ExpiresAt, Expr::value(now))
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::ClassId.eq(class_id))
            .filter(Column::ExpiresAt.gt(now))
            .exec(&self.db)
            .await?;
        let revoked = res.rows_affected;

        tracing::info!(class_id, session_id, lecturer_id, revoked, "QR credentials revoked");
        let entry = NewAuditEntry::new(lecturer_id, AuditAction::QrRevoked, "session", session_id)
            .scoped(class_id, Some(session_id))
            .with_values(None, Some(json!({ "revoked": revoked })));
        self.audit.record_at(with_device(entry, device), now).await;

        Ok(revoked)
    }

    pub async fn validate(
        &self,
        token: &str,
        signature: &str,
        session_id: i64,
        class_id: i64,
    ) -> ServiceResult<CredentialValidation> {
        self.validate_at(token, signature, session_id, class_id, Utc::now())
            .await
    }

    pub async fn validate_at(
        &self,
        token: &str,
        signature: &str,
        session_id: i64,
        class_id: i64,
        now: DateTime<Utc>,
    ) -> ServiceResult<CredentialValidation> {
        self.validate_on(&self.db, token, signature, session_id, class_id, now)
            .await
    }

    /// Signature check, then a single conditional increment of `scanned_count`
    /// that also re-checks expiry and session state.
    pub(crate) async fn validate_on<C>(
        &self,
        conn: &C,
        token: &str,
        signature: &str,
        session_id: i64,
        class_id: i64,
        now: DateTime<Utc>,
    ) -> ServiceResult<CredentialValidation>
    where
        C: ConnectionTrait,
    {
        if !self.signer.verify(token, signature, session_id, class_id) {
            tracing::warn!(session_id, class_id, "Rejected credential: invalid signature");
            return Ok(CredentialValidation::rejected(REASON_INVALID_SIGNATURE));
        }

        let Some(candidate) = CredentialEntity::find()
            .filter(Column::QrToken.eq(token))
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::ClassId.eq(class_id))
            .filter(Column::ExpiresAt.gt(now))
            .one(conn)
            .await?
        else {
            tracing::warn!(session_id, class_id, "Rejected credential: not found or expired");
            return Ok(CredentialValidation::rejected(REASON_NOT_FOUND_OR_EXPIRED));
        };

        let res = CredentialEntity::update_many()
            .col_expr(
                Column::ScannedCount,
                Expr::col(Column::ScannedCount).add(1),
            )
            .filter(Column::Id.eq(candidate.id))
            .filter(Column::ExpiresAt.gt(now))
            .filter(
                Column::SessionId.in_subquery(
                    Query::select()
                        .column(session::Column::Id)
                        .from(session::Entity)
                        .and_where(session::Column::Status.eq(SessionStatus::InProgress))
                        .and_where(session::Column::ScanningEnabled.eq(true))
                        .to_owned(),
                ),
            )
            .exec(conn)
            .await?;

        if res.rows_affected == 0 {
            let accepting = session::Entity::find_by_id(session_id)
                .one(conn)
                .await?
                .is_some_and(|s| s.is_accepting_scans());
            let reason = if accepting {
                REASON_NOT_FOUND_OR_EXPIRED
            } else {
                REASON_NOT_ACCEPTING
            };
            tracing::warn!(session_id, class_id, reason, "Rejected credential");
            return Ok(CredentialValidation::rejected(reason));
        }

        Ok(CredentialValidation::accepted(candidate.id, candidate.expires_at))
    }

    pub async fn active(
        &self,
        class_id: i64,
        session_id: i64,
    ) -> ServiceResult<Option<CredentialPayload>> {
        self.active_at(class_id, session_id, Utc::now()).await
    }

    pub async fn active_at(
        &self,
        class_id: i64,
        session_id: i64,
        now: DateTime<Utc>,
    ) -> ServiceResult<Option<CredentialPayload>> {
        Ok(qr_generation::Model::latest_active(&self.db, class_id, session_id, now)
            .await?
            .map(CredentialPayload::from))
    }

    /// Issued credentials, newest first.
    pub async fn history(
        &self,
        class_id: i64,
        session_id: i64,
        limit: u64,
    ) -> ServiceResult<Vec<qr_generation::Model>> {
        let limit = limit.clamp(1, HISTORY_MAX);
        Ok(qr_generation::Model::history(&self.db, class_id, session_id, limit).await?)
    }
}
