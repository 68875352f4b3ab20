//! Runtime configuration from the environment

use std::path::{Path, PathBuf};

/// Overrides the database location
pub const DATABASE_PATH_ENV: &str = "NUTRICALC_DATABASE_PATH";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: PathBuf,
}

impl Config {
    pub fn from_env() -> Self {
        let database_path = std::env::var(DATABASE_PATH_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let exe = std::env::current_exe().unwrap_or_else(|_| PathBuf::from("./nutricalc"));
                default_database_path(&exe)
            });
        Self { database_path }
    }
}

/// `data/nutricalc.db` in the project root. A binary under `target/release` or
/// `target/debug` resolves to the project that built it.
pub fn default_database_path(exe: &Path) -> PathBuf {
    let mut path = exe
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    if path.ends_with("release") || path.ends_with("debug") {
        if let Some(root) = path.parent().and_then(Path::parent) {
            path = root.to_path_buf();
        }
    }

    path.join("data").join("nutricalc.db")
}
