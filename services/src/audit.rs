//! Best-effort audit trail.
//!
//! Every mutating operation in the core appends one entry after its primary
//! change has been committed. A failed append never fails the caller: it is
//! logged and parked in a bounded dead-letter queue that can be inspected and
//! replayed.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use db::models::audit_log::{self, AuditFilter, NewAuditEntry};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use strum::{Display, EnumString};

use crate::device::DeviceContext;
use crate::error::{ServiceError, ServiceResult};

/// An audit entry whose insert failed.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetter {
    pub entry: NewAuditEntry,
    pub attempted_at: DateTime<Utc>,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct AuditPage {
    pub entries: Vec<audit_log::Model>,
    pub page: u64,
    pub per_page: u64,
    pub total: u64,
}

#[derive(Debug, Serialize)]
pub struct ActionCount {
    pub action: String,
    pub count: i64,
}

/// Activity summary over a time range.
#[derive(Debug, Serialize)]
pub struct ComplianceReport {
    pub generated_at: DateTime<Utc>,
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
    pub total_actions: u64,
    pub unique_users: u64,
    pub successful_actions: u64,
    pub failed_actions: u64,
    pub actions_by_type: Vec<ActionCount>,
    /// Most recent failures, capped at [`REPORT_FAILURE_LIMIT`].
    pub failures: Vec<audit_log::Model>,
}

pub const REPORT_FAILURE_LIMIT: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Json => "application/json",
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

/// A rendered export, ready to be sent as a file download.
#[derive(Debug)]
pub struct AuditExport {
    pub format: ExportFormat,
    pub filename: String,
    pub count: usize,
    pub body: String,
}

const CSV_COLUMNS: [&str; 13] = [
    "id",
    "created_at",
    "user_id",
    "action",
    "resource_type",
    "resource_id",
    "class_id",
    "session_id",
    "status",
    "device_id",
    "device_fingerprint",
    "old_value",
    "new_value",
];

#[derive(Clone)]
pub struct AuditService {
    db: DatabaseConnection,
    dead_letters: Arc<Mutex<VecDeque<DeadLetter>>>,
    capacity: usize,
}

impl AuditService {
    pub fn new(db: DatabaseConnection, dead_letter_capacity: usize) -> Self {
        Self {
            db,
            dead_letters: Arc::new(Mutex::new(VecDeque::new())),
            capacity: dead_letter_capacity.max(1),
        }
    }

    /// Appends `entry`, returning the stored row or `None` if the write failed.
    pub async fn record(&self, entry: NewAuditEntry) -> Option<audit_log::Model> {
        self.record_at(entry, Utc::now()).await
    }

    pub async fn record_at(
        &self,
        entry: NewAuditEntry,
        now: DateTime<Utc>,
    ) -> Option<audit_log::Model> {
        match audit_log::Model::append(&self.db, entry.clone(), now).await {
            Ok(row) => Some(row),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    user_id = entry.user_id,
                    action = %entry.action,
                    resource_type = %entry.resource_type,
                    resource_id = entry.resource_id,
                    "Failed to write audit entry"
                );
                self.park(DeadLetter {
                    entry,
                    attempted_at: now,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    fn park(&self, letter: DeadLetter) {
        let mut queue = match self.dead_letters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if queue.len() >= self.capacity {
            queue.pop_front();
            tracing::warn!(capacity = self.capacity, "Audit dead-letter queue full, dropping oldest entry");
        }
        queue.push_back(letter);
    }

    fn take_dead_letters(&self) -> Vec<DeadLetter> {
        let mut queue = match self.dead_letters.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        queue.drain(..).collect()
    }

    /// Snapshot of audit entries that could not be written.
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        match self.dead_letters.lock() {
            Ok(guard) => guard.iter().cloned().collect(),
            Err(poisoned) => poisoned.into_inner().iter().cloned().collect(),
        }
    }

    /// Retries every parked entry with its original timestamp. Entries that fail
    /// again go back on the queue. Returns how many were written.
    pub async fn replay_dead_letters(&self) -> usize {
        let pending = self.take_dead_letters();
        let mut written = 0;
        for letter in pending {
            if self
                .record_at(letter.entry, letter.attempted_at)
                .await
                .is_some()
            {
                written += 1;
            }
        }
        if written > 0 {
            tracing::info!(written, "Replayed audit dead letters");
        }
        written
    }

    pub async fn search(
        &self,
        filter: &AuditFilter,
        page: u64,
        per_page: u64,
    ) -> ServiceResult<AuditPage> {
        let page = page.max(1);
        let per_page = per_page.clamp(1, 100);
        let (entries, total) = audit_log::Model::search(&self.db, filter, page, per_page).await?;
        Ok(AuditPage {
            entries,
            page,
            per_page,
            total,
        })
    }

    pub async fn for_resource(
        &self,
        resource_type: &str,
        resource_id: i64,
    ) -> ServiceResult<Vec<audit_log::Model>> {
        Ok(audit_log::Model::for_resource(&self.db, resource_type, resource_id).await?)
    }

    pub async fn compliance_report(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> ServiceResult<ComplianceReport> {
        if from > to {
            return Err(ServiceError::Validation(
                "Report start must not be after its end".to_string(),
            ));
        }
        let filter = AuditFilter {
            from: Some(from),
            to: Some(to),
            ..Default::default()
        };

        let total_actions = audit_log::Model::count_matching(&self.db, &filter).await?;
        let unique_users = audit_log::Model::distinct_users(&self.db, &filter).await?;
        let actions_by_type = audit_log::Model::action_counts(&self.db, &filter)
            .await?
            .into_iter()
            .map(|(action, count)| ActionCount { action, count })
            .collect();
        let failures = audit_log::Model::failures(&self.db, &filter, REPORT_FAILURE_LIMIT).await?;
        let successful = AuditFilter {
            status: Some("success".to_string()),
            ..filter
        };
        let successful_actions = audit_log::Model::count_matching(&self.db, &successful).await?;

        Ok(ComplianceReport {
            generated_at: Utc::now(),
            from,
            to,
            total_actions,
            unique_users,
            successful_actions,
            failed_actions: total_actions - successful_actions,
            actions_by_type,
            failures,
        })
    }

    /// Renders every entry matching `filter`, newest first.
    pub async fn export(
        &self,
        filter: &AuditFilter,
        format: ExportFormat,
    ) -> ServiceResult<AuditExport> {
        let rows = audit_log::Model::all_matching(&self.db, filter).await?;
        let body = match format {
            ExportFormat::Json => serde_json::to_string(&rows)?,
            ExportFormat::Csv => to_csv(&rows),
        };
        let filename = format!(
            "audit_logs_{}.{format}",
            Utc::now().format("%Y%m%dT%H%M%SZ")
        );
        tracing::info!(count = rows.len(), %format, "Exported audit entries");
        Ok(AuditExport {
            format,
            filename,
            count: rows.len(),
            body,
        })
    }

    /// Retention: removes entries older than `days` days.
    pub async fn purge_older_than(&self, days: i64) -> ServiceResult<u64> {
        let cutoff = Duration::try_days(days)
            .filter(|_| days > 0)
            .and_then(|span| Utc::now().checked_sub_signed(span))
            .ok_or_else(|| {
                ServiceError::Validation(format!("Retention of {days} days is out of range"))
            })?;
        let removed = audit_log::Model::purge_before(&self.db, cutoff).await?;
        tracing::info!(removed, days, "Purged old audit entries");
        Ok(removed)
    }
}

fn to_csv(rows: &[audit_log::Model]) -> String {
    let mut out = CSV_COLUMNS.join(",");
    out.push('\n');
    for row in rows {
        let json = |value: &Option<serde_json::Value>| {
            value.as_ref().map(|v| v.to_string()).unwrap_or_default()
        };
        let opt = |value: Option<i64>| value.map(|v| v.to_string()).unwrap_or_default();
        let fields = [
            row.id.to_string(),
            row.created_at.to_rfc3339(),
            row.user_id.to_string(),
            row.action.to_string(),
            row.resource_type.clone(),
            row.resource_id.to_string(),
            opt(row.class_id),
            opt(row.session_id),
            row.status.clone(),
            row.device_id.clone().unwrap_or_default(),
            row.device_fingerprint.clone().unwrap_or_default(),
            json(&row.old_value),
            json(&row.new_value),
        ];
        let line: Vec<String> = fields.iter().map(|f| csv_field(f)).collect();
        out.push_str(&line.join(","));
        out.push('\n');
    }
    out
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Attaches a device context to an entry under construction.
pub(crate) fn with_device(entry: NewAuditEntry, device: &DeviceContext) -> NewAuditEntry {
    entry.with_device(device.device_id.clone(), device.device_fingerprint.clone())
}
