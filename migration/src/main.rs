use std::{env, fs, path::Path};

mod runner;

/// Usage: `migration [up|fresh|clean|rollback|status]` (default `up`).
#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let target = env::var("DATABASE_PATH").expect("DATABASE_PATH must be set");
    let file = (!target.starts_with("sqlite:")).then(|| target.clone());
    let url = match &file {
        Some(path) => format!("sqlite://{path}?mode=rwc"),
        None => target.clone(),
    };

    let command = env::args().nth(1).unwrap_or_else(|| "up".to_owned());
    match command.as_str() {
        "clean" => remove_db_file(file.as_deref()),
        "fresh" => {
            remove_db_file(file.as_deref());
            create_db_dir(file.as_deref());
            runner::apply_pending(&url).await;
        }
        "rollback" => runner::rollback_last(&url).await,
        "status" => runner::print_status(&url).await,
        "up" => {
            create_db_dir(file.as_deref());
            runner::apply_pending(&url).await;
        }
        other => {
            eprintln!("Unknown command '{other}'. Expected up, fresh, clean, rollback or status.");
            std::process::exit(2);
        }
    }
}

fn remove_db_file(path: Option<&str>) {
    let Some(path) = path else {
        println!("DATABASE_PATH is a DSN; nothing to delete");
        return;
    };
    let db_path = Path::new(path);
    if db_path.exists() {
        fs::remove_file(db_path).expect("Failed to delete DB file");
        println!("Deleted DB: {}", db_path.display());
    } else {
        println!("DB file does not exist: {}", db_path.display());
    }
}

fn create_db_dir(path: Option<&str>) {
    if let Some(parent) = path.and_then(|p| Path::new(p).parent()) {
        fs::create_dir_all(parent).expect("Failed to create DB directory");
    }
}
