//! Recipe model
//!
//! A stored recipe header with its rounded nutrition totals.

use rusqlite::{params, params_from_iter, types::Value, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbResult;
use crate::nutrition::RecipeResult;
use super::Nutrients;

/// A recipe with stored totals
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub yield_servings: i64,
    pub method: Option<String>,
    pub notes: Option<String>,
    /// Whole-recipe totals, already rounded to reporting precision
    pub totals: Nutrients,
    pub total_weight_g: f64,
    pub omega_ratio: f64,
    pub created_at: String,
}

/// Data for creating a new recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeCreate {
    pub name: String,
    #[serde(default = "default_yield")]
    pub yield_servings: i64,
    pub method: Option<String>,
    pub notes: Option<String>,
}

fn default_yield() -> i64 {
    1
}

impl Recipe {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            name: row.get("name")?,
            yield_servings: row.get("yield_servings")?,
            method: row.get("method")?,
            notes: row.get("notes")?,
            totals: Nutrients::try_from_columns(|col| row.get(col))?,
            total_weight_g: row.get("total_weight_g")?,
            omega_ratio: row.get("omega_ratio")?,
            created_at: row.get("created_at")?,
        })
    }

    /// Insert a recipe header with zeroed totals. Totals are filled in by `update_totals`
    /// once the ingredients have been aggregated against the new id.
    pub fn create(conn: &Connection, data: &RecipeCreate, created_at: &str) -> DbResult<i64> {
        conn.execute(
            r#"
            INSERT INTO recipes (name, yield_servings, method, notes, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                data.name.trim(),
                data.yield_servings,
                data.method,
                data.notes,
                created_at,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Store formatted totals for a recipe
    pub fn update_totals(conn: &Connection, id: i64, result: &RecipeResult) -> DbResult<()> {
        let assignments: Vec<String> = Nutrients::FIELDS
            .iter()
            .enumerate()
            .map(|(i, f)| format!("{} = ?{}", f.key, i + 1))
            .collect();
        let n = assignments.len();
        let sql = format!(
            "UPDATE recipes SET {}, total_weight_g = ?{}, omega_ratio = ?{} WHERE id = ?{}",
            assignments.join(", "),
            n + 1,
            n + 2,
            n + 3,
        );

        let mut values: Vec<Value> = result.total.values().into_iter().map(Value::Real).collect();
        values.push(Value::Real(result.total_weight_g));
        values.push(Value::Real(result.omega_ratio));
        values.push(Value::Integer(id));

        conn.execute(&sql, params_from_iter(values))?;
        Ok(())
    }

    /// Get a recipe by ID
    pub fn get_by_id(conn: &Connection, id: i64) -> DbResult<Option<Self>> {
        let mut stmt = conn.prepare("SELECT * FROM recipes WHERE id = ?1")?;
        let result = stmt.query_row([id], Self::from_row);
        match result {
            Ok(recipe) => Ok(Some(recipe)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// List recipes newest first, optionally filtered by name
    pub fn list(conn: &Connection, query: Option<&str>, limit: i64, offset: i64) -> DbResult<Vec<Self>> {
        let pattern = format!("%{}%", query.unwrap_or(""));
        let mut stmt = conn.prepare(
            "SELECT * FROM recipes WHERE name LIKE ?1 ORDER BY created_at DESC, id DESC LIMIT ?2 OFFSET ?3",
        )?;
        let recipes = stmt
            .query_map(params![pattern, limit, offset], Self::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    /// Count recipes matching an optional name filter
    pub fn count(conn: &Connection, query: Option<&str>) -> DbResult<i64> {
        let pattern = format!("%{}%", query.unwrap_or(""));
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM recipes WHERE name LIKE ?1",
            [pattern],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Delete a recipe and (by cascade) its ingredient rows
    pub fn delete(conn: &Connection, id: i64) -> DbResult<bool> {
        let rows = conn.execute("DELETE FROM recipes WHERE id = ?1", [id])?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::migrations::run_migrations;
    use crate::models::ScaledIngredientRow;
    use crate::nutrition::{format_result, RecipeTotals};

    fn test_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn create(conn: &Connection, name: &str) -> i64 {
        let data = RecipeCreate {
            name: name.to_string(),
            yield_servings: 2,
            method: Some("Boil".to_string()),
            notes: None,
        };
        Recipe::create(conn, &data, "2026-01-01 12:00:00").unwrap()
    }

    fn row(recipe_id: i64, line_no: u32, kcal: f64) -> ScaledIngredientRow {
        let mut nutrients = Nutrients::zero();
        nutrients.energy_kcal = kcal;
        ScaledIngredientRow {
            recipe_id: Some(recipe_id),
            recorded_at: "2026-01-01 12:00:00".to_string(),
            line_no,
            food_code: "A001".to_string(),
            food_name: "Rice".to_string(),
            quantity_g: 50.0,
            nutrients,
        }
    }

    #[test]
    fn test_create_starts_with_zero_totals() {
        let conn = test_conn();
        let id = create(&conn, "Dal");
        let recipe = Recipe::get_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(recipe.name, "Dal");
        assert_eq!(recipe.yield_servings, 2);
        assert_eq!(recipe.totals, Nutrients::zero());
        assert_eq!(recipe.omega_ratio, 0.0);
    }

    #[test]
    fn test_update_totals_round_trip() {
        let conn = test_conn();
        let id = create(&conn, "Kheer");

        let mut totals = RecipeTotals::zero();
        let mut n = Nutrients::zero();
        n.energy_kcal = 200.0;
        n.omega_3 = 10.0;
        n.omega_6 = 5.0;
        totals.fold(&n, 100.0);
        let result = format_result(&totals, 2);

        Recipe::update_totals(&conn, id, &result).unwrap();
        let recipe = Recipe::get_by_id(&conn, id).unwrap().unwrap();
        assert_eq!(recipe.totals.energy_kcal, 200.0);
        assert_eq!(recipe.total_weight_g, 100.0);
        assert_eq!(recipe.omega_ratio, 2.0);
    }

    #[test]
    fn test_rows_follow_insert_order_and_cascade() {
        let conn = test_conn();
        let id = create(&conn, "Upma");

        let rows = vec![row(id, 2, 80.0), row(id, 1, 20.0)];
        assert_eq!(ScaledIngredientRow::insert_all(&conn, id, &rows).unwrap(), 2);

        let stored = ScaledIngredientRow::get_for_recipe(&conn, id).unwrap();
        assert_eq!(stored, rows);
        assert_eq!(ScaledIngredientRow::count_for_recipe(&conn, id).unwrap(), 2);

        assert!(Recipe::delete(&conn, id).unwrap());
        assert_eq!(ScaledIngredientRow::count_for_recipe(&conn, id).unwrap(), 0);
        assert!(!Recipe::delete(&conn, id).unwrap());
    }

    #[test]
    fn test_list_and_count_filter() {
        let conn = test_conn();
        create(&conn, "Tomato soup");
        create(&conn, "Lemon rice");
        create(&conn, "Tomato rice");

        assert_eq!(Recipe::count(&conn, None).unwrap(), 3);
        assert_eq!(Recipe::count(&conn, Some("tomato")).unwrap(), 2);

        let page = Recipe::list(&conn, Some("rice"), 1, 0).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].name, "Tomato rice");
    }
}
