//! Scaled ingredient rows
//!
//! One row per recipe ingredient line that matched a reference record, holding every
//! nutrient scaled to the quantity actually used.

use rusqlite::{params_from_iter, types::Value, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use super::Nutrients;

/// An ingredient line scaled to its gram quantity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScaledIngredientRow {
    /// Owning recipe; unset for preview calculations that are never stored
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe_id: Option<i64>,
    pub recorded_at: String,
    pub line_no: u32,
    pub food_code: String,
    pub food_name: String,
    pub quantity_g: f64,
    /// Nutrients for `quantity_g`, not per 100 g
    pub nutrients: Nutrients,
}

impl ScaledIngredientRow {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            recipe_id: row.get("recipe_id")?,
            recorded_at: row.get("recorded_at")?,
            line_no: row.get("line_no")?,
            food_code: row.get("food_code")?,
            food_name: row.get("food_name")?,
            quantity_g: row.get("quantity_g")?,
            nutrients: Nutrients::try_from_columns(|col| row.get(col))?,
        })
    }

    /// Store rows for a recipe, in the order given
    pub fn insert_all(conn: &Connection, recipe_id: i64, rows: &[ScaledIngredientRow]) -> DbResult<usize> {
        let columns: Vec<&str> = Nutrients::FIELDS.iter().map(|f| f.key).collect();
        let placeholders: Vec<String> = (1..=columns.len() + 6).map(|i| format!("?{}", i)).collect();
        let sql = format!(
            "INSERT INTO recipe_ingredient_rows
                (recipe_id, recorded_at, line_no, food_code, food_name, quantity_g, {})
             VALUES ({})",
            columns.join(", "),
            placeholders.join(", "),
        );

        let mut stmt = conn.prepare(&sql)?;
        for row in rows {
            let mut values: Vec<Value> = vec![
                Value::Integer(recipe_id),
                Value::Text(row.recorded_at.clone()),
                Value::Integer(row.line_no as i64),
                Value::Text(row.food_code.clone()),
                Value::Text(row.food_name.clone()),
                Value::Real(row.quantity_g),
            ];
            values.extend(row.nutrients.values().into_iter().map(Value::Real));
            stmt.execute(params_from_iter(values))?;
        }

        Ok(rows.len())
    }

    /// Rows for a recipe, in line order as inserted
    pub fn get_for_recipe(conn: &Connection, recipe_id: i64) -> DbResult<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT * FROM recipe_ingredient_rows WHERE recipe_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([recipe_id], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn count_for_recipe(conn: &Connection, recipe_id: i64) -> DbResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM recipe_ingredient_rows WHERE recipe_id = ?1",
            [recipe_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}
