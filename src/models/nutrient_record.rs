//! Nutrient Record model
//!
//! One row of the reference nutrient database: per-100g values keyed by food code.
//! Cells are stored as the raw text the source spreadsheet held, and converted to
//! numbers with `parse_or_zero` when a record is read.

use std::collections::HashMap;

use rusqlite::{params_from_iter, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use super::nutrients::{NutrientField, Nutrients};

/// A reference food composition row, normalized to 100 g
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientRecord {
    pub food_code: String,
    pub food_name: String,
    /// Per-100g values
    pub nutrients: Nutrients,
}

/// Data for inserting or replacing a reference row.
///
/// `cells` is keyed by the source column name ("Energy (Kcal)") or the snake_case key
/// ("energy_kcal"); values are kept as text exactly as supplied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NutrientRecordUpsert {
    pub food_code: String,
    pub food_name: String,
    #[serde(default)]
    pub cells: HashMap<String, String>,
}

impl NutrientRecordUpsert {
    /// Raw text for a field, matching by source name first, then key
    pub fn cell(&self, field: &NutrientField) -> Option<&str> {
        self.cells
            .get(field.source_name)
            .or_else(|| self.cells.get(field.key))
            .map(String::as_str)
    }

    /// Names in `cells` that match no known nutrient column
    pub fn unknown_columns(&self) -> Vec<&str> {
        self.cells
            .keys()
            .filter(|k| NutrientField::find(k).is_none())
            .map(String::as_str)
            .collect()
    }
}

impl NutrientRecord {
    /// Build a record from a database row, reading every nutrient cell as text
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let mut cells: HashMap<&'static str, Option<String>> = HashMap::new();
        for field in Nutrients::FIELDS {
            // Cells may have been stored as numbers by an older import
            let value: Option<rusqlite::types::Value> = row.get(field.key)?;
            let text = match value {
                Some(rusqlite::types::Value::Text(s)) => Some(s),
                Some(rusqlite::types::Value::Real(r)) => Some(r.to_string()),
                Some(rusqlite::types::Value::Integer(i)) => Some(i.to_string()),
                _ => None,
            };
            cells.insert(field.key, text);
        }

        Ok(Self {
            food_code: row.get("food_code")?,
            food_name: row.get::<_, Option<String>>("food_name")?.unwrap_or_default(),
            nutrients: Nutrients::from_cells(|f| cells.get(f.key).cloned().flatten()),
        })
    }

    /// Load the whole reference table
    pub fn fetch_all(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM nutrient_records ORDER BY food_code")?;
        let records = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Get a record by food code
    pub fn get_by_code(conn: &Connection, food_code: &str) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM nutrient_records WHERE food_code = ?1")?;
        let result = stmt.query_row([food_code], Self::from_row);
        match result {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Search by food name or code
    pub fn search(conn: &Connection, query: &str, limit: i64) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query);
        let mut stmt = conn.prepare(
            r#"
            SELECT * FROM nutrient_records
            WHERE food_name LIKE ?1 OR food_code LIKE ?1
            ORDER BY food_code ASC
            LIMIT ?2
            "#,
        )?;
        let records = stmt
            .query_map(rusqlite::params![pattern, limit], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    /// Insert a record, replacing any existing row with the same food code
    pub fn upsert(conn: &Connection, data: &NutrientRecordUpsert) -> DbResult<Self> {
        let columns: Vec<&str> = Nutrients::FIELDS.iter().map(|f| f.key).collect();
        let placeholders: Vec<String> = (3..columns.len() + 3).map(|i| format!("?{}", i)).collect();
        let updates: Vec<String> = columns
            .iter()
            .map(|c| format!("{c} = excluded.{c}"))
            .collect();

        let sql = format!(
            "INSERT INTO nutrient_records (food_code, food_name, {}) VALUES (?1, ?2, {})
             ON CONFLICT(food_code) DO UPDATE SET food_name = excluded.food_name, {},
             updated_at = datetime('now')",
            columns.join(", "),
            placeholders.join(", "),
            updates.join(", "),
        );

        let mut values: Vec<Option<String>> = vec![
            Some(data.food_code.trim().to_string()),
            Some(data.food_name.trim().to_string()),
        ];
        values.extend(
            Nutrients::FIELDS
                .iter()
                .map(|f| data.cell(f).map(|s| s.trim().to_string())),
        );

        conn.execute(&sql, params_from_iter(values.iter()))?;

        Self::get_by_code(conn, data.food_code.trim())?.ok_or_else(|| {
            crate::db::DbError::Sqlite(rusqlite::Error::QueryReturnedNoRows)
        })
    }

    /// Count reference rows
    pub fn count(conn: &Connection) -> DbResult<i64> {
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM nutrient_records", [], |row| row.get(0))?;
        Ok(count)
    }

    /// Delete a record. Returns false if the code was not present.
    pub fn delete(conn: &Connection, food_code: &str) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM nutrient_records WHERE food_code = ?1", [food_code])?;
        Ok(rows > 0)
    }
}
