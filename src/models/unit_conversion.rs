//! Unit Conversion model
//!
//! Grams-per-unit and density for a (food code, unit) pair. The table is loaded
//! alongside the reference data but recipe aggregation works in grams only.

use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitConversion {
    pub food_code: String,
    pub unit: String,
    pub grams_per_unit: f64,
    pub density: f64,
}

impl UnitConversion {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            food_code: row.get("food_code")?,
            unit: row.get("unit")?,
            grams_per_unit: row.get::<_, Option<f64>>("grams_per_unit")?.unwrap_or(0.0),
            density: row.get::<_, Option<f64>>("density")?.unwrap_or(0.0),
        })
    }

    pub fn fetch_all(conn: &Connection) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM unit_conversions ORDER BY food_code, unit")?;
        let rows = stmt
            .query_map([], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn list_for_code(conn: &Connection, food_code: &str) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM unit_conversions WHERE food_code = ?1 ORDER BY unit")?;
        let rows = stmt
            .query_map([food_code], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Insert or replace the conversion for (food_code, unit)
    pub fn upsert(conn: &Connection, data: &UnitConversion) -> DbResult<()> {
        conn.execute(
            r#"
            INSERT INTO unit_conversions (food_code, unit, grams_per_unit, density)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(food_code, unit) DO UPDATE SET
                grams_per_unit = excluded.grams_per_unit,
                density = excluded.density
            "#,
            params![
                data.food_code.trim(),
                data.unit.trim().to_lowercase(),
                data.grams_per_unit,
                data.density,
            ],
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;

    #[test]
    fn test_upsert_and_list() {
        let conn = Connection::open_in_memory().unwrap();
        run_migrations(&conn).unwrap();

        let cup = UnitConversion {
            food_code: "A001".to_string(),
            unit: "Cup".to_string(),
            grams_per_unit: 185.0,
            density: 0.78,
        };
        UnitConversion::upsert(&conn, &cup).unwrap();
        UnitConversion::upsert(&conn, &UnitConversion { grams_per_unit: 190.0, ..cup.clone() }).unwrap();

        let listed = UnitConversion::list_for_code(&conn, "A001").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].unit, "cup");
        assert_eq!(listed[0].grams_per_unit, 190.0);

        assert_eq!(UnitConversion::fetch_all(&conn).unwrap().len(), 1);
        assert!(UnitConversion::list_for_code(&conn, "B001").unwrap().is_empty());
    }
}
