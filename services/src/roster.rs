//! Read-only projections over attendance records and verification history.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, NaiveDate, Utc};
use db::models::attendance_log::{self, AttendanceStatus};
use db::models::session::{self, SessionStatus};
use db::models::{lecturer_verification, user};
use sea_orm::{
    ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
};
use serde::Serialize;

use crate::error::{ServiceError, ServiceResult};

pub const DEFAULT_HISTORY_LIMIT: u64 = 20;
const MAX_HISTORY_LIMIT: u64 = 200;

#[derive(Debug, Clone, Serialize)]
pub struct AttendanceHistoryItem {
    pub attendance_id: i64,
    pub session_id: i64,
    pub session_date: DateTime<Utc>,
    pub session_status: SessionStatus,
    pub status: AttendanceStatus,
    pub verified: bool,
    pub verified_by: Option<i64>,
    pub verified_by_name: Option<String>,
    pub verification_time: Option<DateTime<Utc>>,
    pub check_in_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct VerificationHistoryItem {
    #[serde(flatten)]
    pub entry: lecturer_verification::Model,
    pub lecturer_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceSummary {
    pub session_id: i64,
    pub total: u64,
    pub present: u64,
    pub absent: u64,
    pub late: u64,
    pub excused: u64,
    pub verified: u64,
    pub attendance_percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DailyVerificationStats {
    pub date: NaiveDate,
    pub verifications: u64,
    pub students: u64,
    pub present: u64,
    pub absent: u64,
    pub late: u64,
    pub excused: u64,
}

#[derive(Clone)]
pub struct RosterService {
    db: DatabaseConnection,
}

impl RosterService {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn names_of(&self, ids: HashSet<i64>) -> ServiceResult<HashMap<i64, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let users = user::Entity::find()
            .filter(user::Column::Id.is_in(ids))
            .all(&self.db)
            .await?;
        Ok(users.into_iter().map(|u| (u.id, u.full_name)).collect())
    }

    /// A student's records in one class, most recent session first.
    pub async fn student_history(
        &self,
        student_id: i64,
        class_id: i64,
        limit: u64,
    ) -> ServiceResult<Vec<AttendanceHistoryItem>> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let rows = attendance_log::Entity::find()
            .find_also_related(session::Entity)
            .filter(attendance_log::Column::StudentId.eq(student_id))
            .filter(session::Column::ClassId.eq(class_id))
            .order_by_desc(session::Column::ScheduledStart)
            .order_by_desc(attendance_log::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await?;

        let verifiers = rows.iter().filter_map(|(r, _)| r.verified_by).collect();
        let names = self.names_of(verifiers).await?;

        Ok(rows
            .into_iter()
            .filter_map(|(record, session)| {
                let session = session?;
                Some(AttendanceHistoryItem {
                    attendance_id: record.id,
                    session_id: session.id,
                    session_date: session.scheduled_start,
                    session_status: session.status,
                    status: record.status,
                    verified: record.verified,
                    verified_by: record.verified_by,
                    verified_by_name: record.verified_by.and_then(|id| names.get(&id).cloned()),
                    verification_time: record.verification_time,
                    check_in_time: record.check_in_time,
                })
            })
            .collect())
    }

    pub async fn summary(&self, class_id: i64, session_id: i64) -> ServiceResult<AttendanceSummary> {
        session::Model::find_in_class(&self.db, class_id, session_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound("Session not found".into()))?;

        let records = attendance_log::Model::for_session(&self.db, session_id).await?;
        let mut summary = AttendanceSummary {
            session_id,
            ..Default::default()
        };
        for r in &records {
            summary.total += 1;
            match r.status {
                AttendanceStatus::Present => summary.present += 1,
                AttendanceStatus::Absent => summary.absent += 1,
                AttendanceStatus::Late => summary.late += 1,
                AttendanceStatus::Excused => summary.excused += 1,
            }
            if r.verified {
                summary.verified += 1;
            }
        }
        if summary.total > 0 {
            let attended = records.iter().filter(|r| r.status.counts_as_attended()).count();
            summary.attendance_percentage =
                (attended as f64 / summary.total as f64 * 10_000.0).round() / 100.0;
        }
        Ok(summary)
    }

    /// Verification entries of one record, newest first.
    pub async fn verification_history(
        &self,
        class_id: i64,
        attendance_id: i64,
        limit: u64,
    ) -> ServiceResult<Vec<VerificationHistoryItem>> {
        let limit = limit.clamp(1, MAX_HISTORY_LIMIT);
        let entries = lecturer_verification::Model::for_attendance(&self.db, attendance_id, limit)
            .await?
            .into_iter()
            .filter(|e| e.class_id == class_id)
            .collect::<Vec<_>>();

        let names = self
            .names_of(entries.iter().map(|e| e.lecturer_id).collect())
            .await?;
        Ok(entries
            .into_iter()
            .map(|entry| VerificationHistoryItem {
                lecturer_name: names.get(&entry.lecturer_id).cloned(),
                entry,
            })
            .collect())
    }

    /// Per-day counts of a lecturer's verification activity in a class, newest day first.
    pub async fn verification_stats(
        &self,
        lecturer_id: i64,
        class_id: i64,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> ServiceResult<Vec<DailyVerificationStats>> {
        let mut query = lecturer_verification::Entity::find()
            .filter(lecturer_verification::Column::LecturerId.eq(lecturer_id))
            .filter(lecturer_verification::Column::ClassId.eq(class_id));
        if let Some(from) = from {
            query = query.filter(lecturer_verification::Column::VerifiedAt.gte(from));
        }
        if let Some(to) = to {
            query = query.filter(lecturer_verification::Column::VerifiedAt.lte(to));
        }
        let entries = query.all(&self.db).await?;

        #[derive(Default)]
        struct Day {
            verifications: u64,
            students: HashSet<i64>,
            by_status: HashMap<AttendanceStatus, HashSet<i64>>,
        }

        let mut days: BTreeMap<NaiveDate, Day> = BTreeMap::new();
        for e in entries {
            let day = days.entry(e.verified_at.date_naive()).or_default();
            day.verifications += 1;
            day.students.insert(e.student_id);
            day.by_status
                .entry(e.verified_status)
                .or_default()
                .insert(e.student_id);
        }

        let count = |day: &Day, status: AttendanceStatus| day.by_status.get(&status).map_or(0, |s| s.len() as u64);
        Ok(days
            .into_iter()
            .rev()
            .map(|(date, day)| DailyVerificationStats {
                date,
                verifications: day.verifications,
                students: day.students.len() as u64,
                present: count(&day, AttendanceStatus::Present),
                absent: count(&day, AttendanceStatus::Absent),
                late: count(&day, AttendanceStatus::Late),
                excused: count(&day, AttendanceStatus::Excused),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attendance::Marking;
    use crate::test_support::Fixture;
    use chrono::Duration;

    fn marking(student_id: i64, status: AttendanceStatus) -> Marking {
        Marking {
            student_id,
            status,
            reason: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn summary_counts_statuses_and_percentage() {
        let fx = Fixture::started().await;
        let att = &fx.core.attendance;
        att.bulk_mark(
            fx.lecturer.id,
            fx.class.id,
            fx.session.id,
            vec![
                marking(fx.students[0].id, AttendanceStatus::Present),
                marking(fx.students[1].id, AttendanceStatus::Absent),
                marking(fx.students[2].id, AttendanceStatus::Late),
            ],
            &fx.device,
        )
        .await
        .unwrap();

        let s = fx.core.roster.summary(fx.class.id, fx.session.id).await.unwrap();
        assert_eq!(s.total, 3);
        assert_eq!((s.present, s.absent, s.late, s.excused), (1, 1, 1, 0));
        assert_eq!(s.verified, 3);
        assert_eq!(s.attendance_percentage, 66.67);
    }

    #[tokio::test]
    async fn summary_of_empty_session_is_zero() {
        let fx = Fixture::new().await;
        let s = fx.core.roster.summary(fx.class.id, fx.session.id).await.unwrap();
        assert_eq!(s.total, 0);
        assert_eq!(s.attendance_percentage, 0.0);
    }

    #[tokio::test]
    async fn student_history_is_newest_session_first_with_verifier_name() {
        let fx = Fixture::started().await;
        let student = fx.students[0].id;
        let earlier = session::Model::create(&fx.db, fx.class.id, fx.session.scheduled_start - Duration::days(7))
            .await
            .unwrap();

        let att = &fx.core.attendance;
        att.mark(fx.lecturer.id, fx.class.id, earlier.id, marking(student, AttendanceStatus::Absent), &fx.device)
            .await
            .unwrap();
        att.mark(fx.lecturer.id, fx.class.id, fx.session.id, marking(student, AttendanceStatus::Present), &fx.device)
            .await
            .unwrap();

        let history = fx
            .core
            .roster
            .student_history(student, fx.class.id, DEFAULT_HISTORY_LIMIT)
            .await
            .unwrap();
        let sessions: Vec<i64> = history.iter().map(|h| h.session_id).collect();
        assert_eq!(sessions, vec![fx.session.id, earlier.id]);
        assert_eq!(history[0].verified_by_name.as_deref(), Some(fx.lecturer.full_name.as_str()));
    }

    #[tokio::test]
    async fn verification_history_and_stats() {
        let fx = Fixture::started().await;
        let att = &fx.core.attendance;
        let student = fx.students[0].id;
        let marked = att
            .mark(fx.lecturer.id, fx.class.id, fx.session.id, marking(student, AttendanceStatus::Absent), &fx.device)
            .await
            .unwrap();
        att.mark(fx.lecturer.id, fx.class.id, fx.session.id, marking(student, AttendanceStatus::Excused), &fx.device)
            .await
            .unwrap();
        att.mark(fx.lecturer.id, fx.class.id, fx.session.id, marking(fx.students[1].id, AttendanceStatus::Present), &fx.device)
            .await
            .unwrap();

        let history = fx
            .core
            .roster
            .verification_history(fx.class.id, marked.attendance.id, DEFAULT_HISTORY_LIMIT)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].entry.verified_status, AttendanceStatus::Excused);
        assert_eq!(history[0].entry.original_status, Some(AttendanceStatus::Absent));
        assert_eq!(history[1].entry.original_status, None);

        let stats = fx
            .core
            .roster
            .verification_stats(fx.lecturer.id, fx.class.id, None, None)
            .await
            .unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].verifications, 3);
        assert_eq!(stats[0].students, 2);
        assert_eq!(stats[0].present, 1);
        assert_eq!(stats[0].excused, 1);
        assert_eq!(stats[0].absent, 1);

        let other = fx
            .core
            .roster
            .verification_stats(fx.other_lecturer.id, fx.class.id, None, None)
            .await
            .unwrap();
        assert!(other.is_empty());
    }
}
