//! Nutricalc Tools module
//!
//! Request handlers behind the MCP tools. Each takes the shared `Database` and
//! returns a serializable response or a message for the caller.

pub mod derived;
pub mod nutrients;
pub mod recipes;
pub mod status;

#[cfg(test)]
pub(crate) mod test_support {
    use tempfile::TempDir;

    use crate::db::{migrations::run_migrations, Database};

    /// A migrated database in a scratch directory. Keep the `TempDir` alive for the test.
    pub fn test_db() -> (Database, TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::new(dir.path().join("test.db")).unwrap();
        db.with_conn(run_migrations).unwrap();
        (db, dir)
    }
}
