//! Nutricalc Status Tool
//!
//! Provides runtime status information about the service and its database.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use sysinfo::{Pid, ProcessesToUpdate, System};

use crate::build_info::BuildInfo;
use crate::db::migrations::{get_schema_version, needs_migration};
use crate::db::Database;
use crate::models::{NutrientRecord, Recipe};

/// Usage guide for AI assistants
pub const USAGE_INSTRUCTIONS: &str = r#"
# Nutricalc Usage

Nutricalc computes recipe nutrition from a per-100g reference table.

## 1. Load the reference table

- `import_nutrient_records` with a CSV or JSON export. Columns use the reference
  names, e.g. "Food code", "Food name", "Protein (g)", "Energy (Kcal)".
- `add_nutrient_record` adds or replaces a single food.
- Blank, non-numeric, zero and negative cells all read as 0.

## 2. Describe the recipe

Each ingredient line needs a `code` (the food code) and `quantity_g` in grams.
`name` is optional and only labels the row. Lines whose code is not in the table
are skipped and reported; they do not fail the calculation.

## 3. Calculate

- `calculate_recipe_nutrition` returns totals and per-serving values without storing anything.
- `create_recipe` does the same and stores the recipe with its scaled rows.
- `get_recipe`, `list_recipes`, `delete_recipe` manage stored recipes.

`yield_servings` must be at least 1. Totals are rounded per nutrient (most to 2
decimals, B1/B2/B6 and cobalt to 3). Per-serving values use unrounded totals.

## 4. Derived values

`compute_derived_nutrients` gives vitamin D, vitamin A and omega-3/omega-6 from
raw composition values. Set `vegetarian` to false to include EPA, DHA and other
animal-source fatty acids.
"#;

/// Status information about the Nutricalc service
#[derive(Debug, Serialize)]
pub struct NutricalcStatus {
    pub build_number: u64,
    pub build_timestamp: &'static str,
    pub version: &'static str,
    pub database_path: String,
    pub database_size_bytes: Option<u64>,
    pub schema_version: Option<i32>,
    pub needs_migration: Option<bool>,
    pub nutrient_records: Option<i64>,
    pub recipes: Option<i64>,
    pub uptime_seconds: u64,
    pub process_id: u32,
    pub memory_usage_bytes: u64,
}

/// Tracks service start time for status reporting
pub struct StatusTracker {
    start_time: Instant,
    database_path: PathBuf,
}

impl StatusTracker {
    pub fn new(database_path: PathBuf) -> Self {
        Self {
            start_time: Instant::now(),
            database_path,
        }
    }

    /// Get the current status. Database fields are left empty if the database can't be read.
    pub fn get_status(&self, db: &Database) -> NutricalcStatus {
        let build_info = BuildInfo::current();

        let database_size_bytes = std::fs::metadata(&self.database_path)
            .ok()
            .map(|m| m.len());

        let db_stats = db
            .with_conn(|conn| {
                Ok((
                    get_schema_version(conn)?,
                    needs_migration(conn)?,
                    NutrientRecord::count(conn)?,
                    Recipe::count(conn, None)?,
                ))
            })
            .map_err(|e| tracing::warn!("Failed to read database stats: {}", e))
            .ok();

        let pid = std::process::id();
        let mut sys = System::new();
        sys.refresh_processes(ProcessesToUpdate::Some(&[Pid::from_u32(pid)]));

        let memory_usage_bytes = sys
            .process(Pid::from_u32(pid))
            .map(|p| p.memory())
            .unwrap_or(0);

        NutricalcStatus {
            build_number: build_info.build_number,
            build_timestamp: build_info.build_timestamp,
            version: build_info.version,
            database_path: self.database_path.display().to_string(),
            database_size_bytes,
            schema_version: db_stats.map(|s| s.0),
            needs_migration: db_stats.map(|s| s.1),
            nutrient_records: db_stats.map(|s| s.2),
            recipes: db_stats.map(|s| s.3),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            process_id: pid,
            memory_usage_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::test_db;

    #[test]
    fn test_status_reports_database() {
        let (db, dir) = test_db();
        let tracker = StatusTracker::new(dir.path().join("test.db"));
        let status = tracker.get_status(&db);

        assert_eq!(status.needs_migration, Some(false));
        assert_eq!(status.nutrient_records, Some(0));
        assert_eq!(status.recipes, Some(0));
        assert!(status.database_size_bytes.is_some());
        assert_eq!(status.process_id, std::process::id());
    }
}
