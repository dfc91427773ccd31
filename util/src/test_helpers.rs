use crate::config::AppConfig;
use tempfile::TempDir;

/// Creates a unique temporary directory to act as `STORAGE_ROOT` for a test.
/// The directory is automatically cleaned up when the returned `TempDir` is dropped.
///
/// Keep the returned `TempDir` in scope for as long as you need the files.
pub fn setup_test_storage_root() -> TempDir {
    TempDir::new().expect("failed to create tempdir")
}

/// A configuration pointing at `storage`, with mail disabled and no API key.
pub fn test_config(storage: &TempDir) -> AppConfig {
    let abs = storage
        .path()
        .canonicalize()
        .unwrap_or_else(|_| storage.path().to_path_buf());

    AppConfig {
        env: "test".into(),
        storage_root: abs.to_string_lossy().into_owned(),
        database_path: "sqlite::memory:".into(),
        disable_email: true,
        ..AppConfig::default()
    }
}
