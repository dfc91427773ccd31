use migration::database::{database_file, database_url, ensure_database_dir};
use std::fs;
use util::config::AppConfig;

mod runner;

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env();
    let db_path = config.database_path;
    let url = database_url(&db_path);
    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("clean") => {
            remove_db_file(&db_path);
        }
        Some("fresh") => {
            remove_db_file(&db_path);
            create_db_dir(&db_path);
            runner::run_all_migrations(&url).await;
        }
        _ => {
            create_db_dir(&db_path);
            runner::run_all_migrations(&url).await;
        }
    }
}

fn remove_db_file(path_or_url: &str) {
    let Some(db_path) = database_file(path_or_url) else {
        println!("In-memory DB, nothing to delete");
        return;
    };
    if db_path.exists() {
        fs::remove_file(&db_path).expect("Failed to delete DB file");
        println!("Deleted DB: {}", db_path.display());
    } else {
        println!("DB file does not exist: {}", db_path.display());
    }
}

fn create_db_dir(path_or_url: &str) {
    ensure_database_dir(path_or_url).expect("Failed to create DB directory");
}
