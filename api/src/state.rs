//! Application state shared across Axum route handlers.

use sea_orm::DatabaseConnection;
use services::{AttendanceCore, CoreSettings};

/// Owns the connection pool and the attendance core built on top of it.
/// Constructed once at startup and cloned into every handler.
#[derive(Clone)]
pub struct AppState {
    db: DatabaseConnection,
    core: AttendanceCore,
}

impl AppState {
    pub fn new(db: DatabaseConnection, settings: CoreSettings) -> Self {
        Self {
            core: AttendanceCore::new(db.clone(), settings),
            db,
        }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn core(&self) -> &AttendanceCore {
        &self.core
    }
}
