pub mod models;
pub mod test_utils;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::path::Path;
use util::config;

/// Opens the shared connection pool for the configured database.
///
/// `DATABASE_PATH` may be a full `sqlite:` DSN or a plain file path; for a
/// path, missing parent directories are created and the file is created on
/// first use.
pub async fn connect() -> Result<DatabaseConnection, DbErr> {
    let path_or_url = config::database_path();
    let url = if path_or_url.starts_with("sqlite:") {
        path_or_url
    } else {
        if let Some(parent) = Path::new(&path_or_url).parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        format!("sqlite://{path_or_url}?mode=rwc")
    };

    tracing::debug!(url = %url, "connecting to database");
    connect_to(&url).await
}

/// Connects to `url` with a single pooled connection.
///
/// SQLite admits one writer at a time. With one connection, concurrent
/// transactions queue for the pool instead of failing with `database is locked`.
pub async fn connect_to(url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(url.to_owned());
    options.max_connections(1).sqlx_logging(false);
    Database::connect(options).await
}
