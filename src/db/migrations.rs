//! Database migrations
//!
//! Schema creation and versioning. Nutrient columns are generated from the
//! canonical field table so the schema and `Nutrients` cannot drift apart.

use rusqlite::Connection;

use super::connection::DbResult;
use crate::models::Nutrients;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Run all migrations to bring the database up to the current schema version
pub fn run_migrations(conn: &Connection) -> DbResult<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    let current_version = get_schema_version(conn)?;

    if current_version < 1 {
        migrate_v1(conn)?;
        conn.execute("INSERT INTO schema_migrations (version) VALUES (1)", [])?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}

/// One column definition per nutrient, e.g. "protein REAL NOT NULL DEFAULT 0"
fn nutrient_columns(definition: &str) -> String {
    Nutrients::FIELDS
        .iter()
        .map(|f| format!("            {} {},", f.key, definition))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Migration v1: initial schema
fn migrate_v1(conn: &Connection) -> DbResult<()> {
    let raw_cells = nutrient_columns("TEXT");
    let amounts = nutrient_columns("REAL NOT NULL DEFAULT 0");

    let sql = format!(
        r#"
        -- Reference composition table, per 100 g. Cells keep the raw source text.
        CREATE TABLE nutrient_records (
            food_code TEXT PRIMARY KEY,
            food_name TEXT NOT NULL DEFAULT '',
{raw_cells}
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX idx_nutrient_records_name ON nutrient_records(food_name);

        CREATE TABLE unit_conversions (
            food_code TEXT NOT NULL,
            unit TEXT NOT NULL,
            grams_per_unit REAL NOT NULL DEFAULT 0,
            density REAL NOT NULL DEFAULT 0,
            PRIMARY KEY (food_code, unit)
        );

        -- Recipe headers with rounded whole-recipe totals
        CREATE TABLE recipes (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT NOT NULL,
            yield_servings INTEGER NOT NULL,
            method TEXT,
            notes TEXT,
{amounts}
            total_weight_g REAL NOT NULL DEFAULT 0,
            omega_ratio REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        );

        CREATE INDEX idx_recipes_name ON recipes(name);

        -- Per-ingredient nutrients scaled to the quantity used
        CREATE TABLE recipe_ingredient_rows (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            recipe_id INTEGER NOT NULL,
            recorded_at TEXT NOT NULL,
            line_no INTEGER NOT NULL,
            food_code TEXT NOT NULL,
            food_name TEXT NOT NULL,
            quantity_g REAL NOT NULL,
{amounts}
            FOREIGN KEY (recipe_id) REFERENCES recipes(id) ON DELETE CASCADE
        );

        CREATE INDEX idx_recipe_ingredient_rows_recipe ON recipe_ingredient_rows(recipe_id);
        "#
    );

    conn.execute_batch(&sql)?;
    Ok(())
}

/// Get the current schema version
pub fn get_schema_version(conn: &Connection) -> DbResult<i32> {
    let version: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);
    Ok(version)
}

/// Check if the database needs migration
pub fn needs_migration(conn: &Connection) -> DbResult<bool> {
    Ok(get_schema_version(conn)? < SCHEMA_VERSION)
}
