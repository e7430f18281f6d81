use colored::*;
use futures::FutureExt;
use migration::Migrator;
use sea_orm::DatabaseConnection;
use sea_orm_migration::MigrationStatus;
use sea_orm_migration::prelude::*;
use std::io::{self, Write};
use std::time::Instant;

const STATUS_COLUMN: usize = 72;

async fn open(url: &str) -> DatabaseConnection {
    sea_orm::Database::connect(url)
        .await
        .expect("DB connection failed")
}

fn print_step(label: &str, name: &str) {
    let line = format!("{label} {}", name.bold());
    let dots = ".".repeat(STATUS_COLUMN.saturating_sub(line.len()));
    print!("{line}{dots} ");
    let _ = io::stdout().flush();
}

/// Applies every pending migration one at a time, reporting each.
pub async fn apply_pending(url: &str) {
    let db = open(url).await;

    let pending = Migrator::get_pending_migrations(&db)
        .await
        .expect("Failed to read migration state");
    if pending.is_empty() {
        println!("{}", "Schema is up to date".green());
        return;
    }

    for migration in pending {
        print_step("Applying", migration.name());
        let start = Instant::now();
        let result = std::panic::AssertUnwindSafe(Migrator::up(&db, Some(1)))
            .catch_unwind()
            .await;

        match result {
            Ok(Ok(())) => {
                let time_str = format!("({:.2?})", start.elapsed()).dimmed();
                println!("{} {}", "done".green(), time_str);
            }
            Ok(Err(err)) => {
                println!("{} {}", "failed".red(), err);
                std::process::exit(1);
            }
            Err(_) => {
                println!("{}", "panicked".red());
                std::process::exit(1);
            }
        }
    }
}

/// Reverts the most recently applied migration.
pub async fn rollback_last(url: &str) {
    let db = open(url).await;
    let applied = Migrator::get_applied_migrations(&db)
        .await
        .expect("Failed to read migration state");
    let Some(last) = applied.last() else {
        println!("{}", "Nothing to roll back".yellow());
        return;
    };

    print_step("Reverting", last.name());
    match Migrator::down(&db, Some(1)).await {
        Ok(()) => println!("{}", "done".green()),
        Err(err) => {
            println!("{} {}", "failed".red(), err);
            std::process::exit(1);
        }
    }
}

pub async fn print_status(url: &str) {
    let db = open(url).await;
    let migrations = Migrator::get_migration_with_status(&db)
        .await
        .expect("Failed to read migration state");

    for migration in migrations {
        let status = match migration.status() {
            MigrationStatus::Applied => "applied".green(),
            MigrationStatus::Pending => "pending".yellow(),
        };
        print_step("", migration.name());
        println!("{status}");
    }
}
