pub mod models;
pub mod test_utils;

use migration::Migrator;
use migration::database::{database_url, ensure_database_dir};
use sea_orm::{Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;

/// Opens the feedback store.
///
/// `path_or_url` may be a full DSN (`sqlite:...`) or a plain SQLite file path,
/// in which case the file is opened in read-write-create mode. The directory
/// holding the file is created first.
pub async fn connect(path_or_url: &str) -> Result<DatabaseConnection, DbErr> {
    ensure_database_dir(path_or_url)
        .map_err(|e| DbErr::Custom(format!("could not create database directory: {e}")))?;

    let url = database_url(path_or_url);
    tracing::debug!(%url, "Connecting to feedback store");
    Database::connect(&url).await
}

/// Creates the schema if it is missing. Safe to call before every batch.
pub async fn init_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    Migrator::up(db, None).await
}
