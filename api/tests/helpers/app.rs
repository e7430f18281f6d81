use api::{auth::generate_jwt, routes::routes, state::AppState};
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use db::models::{Role, class, session, user};
use db::test_utils::setup_test_db;
use sea_orm::DatabaseConnection;
use serde_json::Value;
use services::CoreSettings;
use tower::ServiceExt;
use util::config::AppConfig;

pub const TEST_JWT_SECRET: &str = "api-test-jwt-secret";

/// Users, a class and a scheduled session, with bearer tokens for each user.
pub struct Seed {
    pub lecturer: user::Model,
    pub other_lecturer: user::Model,
    pub student: user::Model,
    pub other_student: user::Model,
    pub admin: user::Model,
    pub class: class::Model,
    pub session: session::Model,
}

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub db: DatabaseConnection,
    pub seed: Seed,
}

fn configure() {
    unsafe {
        std::env::set_var("DATABASE_PATH", "sqlite::memory:");
        std::env::set_var("JWT_SECRET", TEST_JWT_SECRET);
    }
    AppConfig::set_jwt_secret(TEST_JWT_SECRET);
}

pub fn test_settings() -> CoreSettings {
    CoreSettings {
        credential_secret: "api-test-credential-secret".into(),
        credential_validity: Duration::seconds(35),
        audit_dead_letter_capacity: 16,
    }
}

async fn seed(db: &DatabaseConnection) -> Seed {
    let lecturer = user::Model::create(db, "lect", "lect@uni.test", "Dr Lecturer", Role::Lecturer)
        .await
        .unwrap();
    let other_lecturer = user::Model::create(db, "other", "other@uni.test", "Dr Other", Role::Lecturer)
        .await
        .unwrap();
    let student = user::Model::create(db, "stu", "stu@uni.test", "Sam Student", Role::Student)
        .await
        .unwrap();
    let other_student = user::Model::create(db, "stu2", "stu2@uni.test", "Alex Student", Role::Student)
        .await
        .unwrap();
    let admin = user::Model::create(db, "admin", "admin@uni.test", "Admin", Role::Admin)
        .await
        .unwrap();
    let class = class::Model::create(db, "COS301", "Software Engineering", lecturer.id)
        .await
        .unwrap();
    let session = session::Model::create(db, class.id, Utc::now()).await.unwrap();

    Seed {
        lecturer,
        other_lecturer,
        student,
        other_student,
        admin,
        class,
        session,
    }
}

pub async fn make_test_app() -> TestApp {
    configure();

    let db = setup_test_db().await;
    let seed = seed(&db).await;
    let state = AppState::new(db.clone(), test_settings());
    let router = Router::new().nest("/api", routes(state.clone()));

    TestApp {
        router,
        state,
        db,
        seed,
    }
}

pub fn token_for(user: &user::Model) -> String {
    generate_jwt(user.id, user.role == Role::Admin).0
}

impl TestApp {
    /// Sends one request through the router and decodes the JSON reply.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("x-device-id", "test-device")
            .header("x-device-fingerprint", "test-fingerprint");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        let req = match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(req).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes)
                .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
        };
        (status, json)
    }

    pub fn session_uri(&self, suffix: &str) -> String {
        format!(
            "/api/classes/{}/sessions/{}{}",
            self.seed.class.id, self.seed.session.id, suffix
        )
    }

    /// Starts the seeded session as its lecturer.
    pub async fn start_session(&self) {
        let token = token_for(&self.seed.lecturer);
        let (status, _) = self
            .send("POST", &self.session_uri("/start"), Some(&token), None)
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    /// Issues a credential as the lecturer and returns its payload.
    pub async fn issue_credential(&self) -> Value {
        let token = token_for(&self.seed.lecturer);
        let (status, json) = self
            .send(
                "POST",
                &self.session_uri("/credentials"),
                Some(&token),
                Some(serde_json::json!({})),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{json}");
        json["data"].clone()
    }
}
