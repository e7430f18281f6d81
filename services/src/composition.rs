use chrono::Duration;
use sea_orm::DatabaseConnection;
use util::config;

use crate::attendance::AttendanceService;
use crate::audit::AuditService;
use crate::credential::{CredentialService, CredentialSigner};
use crate::roster::RosterService;
use crate::session::SessionService;

/// Process-wide knobs of the attendance core.
#[derive(Debug, Clone)]
pub struct CoreSettings {
    pub credential_secret: String,
    pub credential_validity: Duration,
    pub audit_dead_letter_capacity: usize,
}

pub const DEFAULT_CREDENTIAL_VALIDITY_SECONDS: i64 = 35;

impl CoreSettings {
    pub fn from_config() -> Self {
        Self {
            credential_secret: config::credential_secret(),
            credential_validity: credential_validity(config::credential_validity_seconds()),
            audit_dead_letter_capacity: config::audit_dead_letter_capacity(),
        }
    }
}

/// A zero or unrepresentable lifetime would mint credentials that are already
/// expired, so it falls back to the default.
fn credential_validity(seconds: u64) -> Duration {
    i64::try_from(seconds)
        .ok()
        .filter(|s| *s > 0)
        .and_then(Duration::try_seconds)
        .unwrap_or_else(|| {
            tracing::warn!(
                seconds,
                default = DEFAULT_CREDENTIAL_VALIDITY_SECONDS,
                "Invalid credential validity, using the default"
            );
            Duration::seconds(DEFAULT_CREDENTIAL_VALIDITY_SECONDS)
        })
}

/// Every service of the core wired over one shared connection pool and one
/// audit trail. Cheap to clone.
#[derive(Clone)]
pub struct AttendanceCore {
    pub audit: AuditService,
    pub sessions: SessionService,
    pub credentials: CredentialService,
    pub attendance: AttendanceService,
    pub roster: RosterService,
}

impl AttendanceCore {
    pub fn new(db: DatabaseConnection, settings: CoreSettings) -> Self {
        let audit = AuditService::new(db.clone(), settings.audit_dead_letter_capacity);
        let credentials = CredentialService::new(
            db.clone(),
            audit.clone(),
            CredentialSigner::new(settings.credential_secret.as_bytes()),
            settings.credential_validity,
        );
        Self {
            sessions: SessionService::new(db.clone(), audit.clone()),
            attendance: AttendanceService::new(db.clone(), audit.clone(), credentials.clone()),
            roster: RosterService::new(db),
            credentials,
            audit,
        }
    }
}
