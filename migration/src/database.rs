//! `DATABASE_PATH` may be a plain SQLite file path or a full `sqlite:` DSN.

use std::io;
use std::path::{Path, PathBuf};

/// Connection URL for `path_or_url`. Plain paths open in read-write-create mode.
pub fn database_url(path_or_url: &str) -> String {
    if path_or_url.starts_with("sqlite:") {
        path_or_url.to_string()
    } else {
        format!("sqlite://{path_or_url}?mode=rwc")
    }
}

/// The database file on disk, or `None` for in-memory databases.
pub fn database_file(path_or_url: &str) -> Option<PathBuf> {
    let path = match path_or_url.strip_prefix("sqlite:") {
        Some(rest) => {
            let rest = rest.strip_prefix("//").unwrap_or(rest);
            rest.split('?').next().unwrap_or_default()
        }
        None => path_or_url,
    };

    if path.is_empty() || path == ":memory:" {
        None
    } else {
        Some(PathBuf::from(path))
    }
}

/// Creates the directory holding the database file. SQLite won't.
pub fn ensure_database_dir(path_or_url: &str) -> io::Result<()> {
    match database_file(path_or_url).as_deref().and_then(Path::parent) {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
