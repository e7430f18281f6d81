//! Seeded databases for service tests.

use chrono::{Duration, Utc};
use db::models::{Role, class, session, user};
use db::test_utils::setup_test_db;
use sea_orm::DatabaseConnection;

use crate::composition::{AttendanceCore, CoreSettings};
use crate::credential::CredentialPayload;
use crate::device::DeviceContext;

pub struct Fixture {
    pub db: DatabaseConnection,
    pub core: AttendanceCore,
    pub lecturer: user::Model,
    pub other_lecturer: user::Model,
    pub students: Vec<user::Model>,
    pub class: class::Model,
    pub session: session::Model,
    pub device: DeviceContext,
}

pub fn test_settings() -> CoreSettings {
    CoreSettings {
        credential_secret: "test-credential-secret".into(),
        credential_validity: Duration::seconds(35),
        audit_dead_letter_capacity: 16,
    }
}

impl Fixture {
    /// One class with a scheduled session, its lecturer, a second lecturer and three students.
    pub async fn new() -> Self {
        Self::on(setup_test_db().await).await
    }

    /// Seeds `db`, which must already be migrated.
    pub async fn on(db: DatabaseConnection) -> Self {
        let lecturer = user::Model::create(&db, "lect", "lect@uni.test", "Dr Ada Lovelace", Role::Lecturer)
            .await
            .unwrap();
        let other_lecturer = user::Model::create(&db, "other", "other@uni.test", "Dr Other", Role::Lecturer)
            .await
            .unwrap();
        let mut students = Vec::new();
        for i in 0..3 {
            students.push(
                user::Model::create(
                    &db,
                    &format!("s{i}"),
                    &format!("s{i}@uni.test"),
                    &format!("Student {i}"),
                    Role::Student,
                )
                .await
                .unwrap(),
            );
        }
        let class = class::Model::create(&db, "COS301", "Software Engineering", lecturer.id)
            .await
            .unwrap();
        let session = session::Model::create(&db, class.id, Utc::now()).await.unwrap();

        Self {
            core: AttendanceCore::new(db.clone(), test_settings()),
            db,
            lecturer,
            other_lecturer,
            students,
            class,
            session,
            device: DeviceContext::new("device-1", "fp-1"),
        }
    }

    /// Same as [`Fixture::new`] with the session already started.
    pub async fn started() -> Self {
        Self::start(Self::new().await).await
    }

    pub async fn started_on(db: DatabaseConnection) -> Self {
        Self::start(Self::on(db).await).await
    }

    async fn start(mut fx: Self) -> Self {
        fx.session = fx
            .core
            .sessions
            .start(fx.class.id, fx.session.id, fx.lecturer.id, &fx.device)
            .await
            .unwrap();
        fx
    }

    pub async fn issue(&self) -> CredentialPayload {
        self.core
            .credentials
            .issue(self.class.id, self.session.id, self.lecturer.id, None, &self.device)
            .await
            .unwrap()
    }

    /// Checks `student_id` in with a fresh credential and returns the attendance id.
    pub async fn check_in(&self, student_id: i64) -> i64 {
        let credential = self.issue().await;
        match self
            .core
            .attendance
            .check_in(
                student_id,
                &credential.token,
                &credential.signature,
                self.session.id,
                self.class.id,
                &self.device,
            )
            .await
            .unwrap()
        {
            crate::attendance::CheckInOutcome::CheckedIn { attendance_id } => attendance_id,
            other => panic!("check-in failed: {other:?}"),
        }
    }
}
