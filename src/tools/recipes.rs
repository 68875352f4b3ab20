//! Recipe Tools
//!
//! Calculate recipe nutrition from ingredient lines, and store, fetch, list and delete
//! computed recipes.

use rusqlite::Connection;
use serde::Serialize;

use crate::db::Database;
use crate::models::{NutrientRecord, Recipe, RecipeCreate, ScaledIngredientRow, UnitConversion};
use crate::nutrition::{
    aggregate, format_result, IngredientLine, NutrientTable, RecipeResult, RecipeTotals, SkippedLine,
};

/// Response for calculate_recipe (nothing is stored)
#[derive(Debug, Serialize)]
pub struct CalculateRecipeResponse {
    pub result: RecipeResult,
    pub rows: Vec<ScaledIngredientRow>,
    pub skipped: Vec<SkippedLine>,
    pub reference_records: usize,
    pub unit_conversions_loaded: usize,
}

/// Response for create_recipe
#[derive(Debug, Serialize)]
pub struct CreateRecipeResponse {
    pub id: i64,
    pub name: String,
    pub created_at: String,
    pub result: RecipeResult,
    pub rows_saved: usize,
    pub skipped: Vec<SkippedLine>,
}

/// Full recipe detail with its scaled ingredient rows
#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub name: String,
    pub yield_servings: i64,
    pub method: Option<String>,
    pub notes: Option<String>,
    pub created_at: String,
    pub result: RecipeResult,
    pub rows: Vec<ScaledIngredientRow>,
}

/// Recipe summary for listing
#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub name: String,
    pub yield_servings: i64,
    pub energy_kcal: f64,
    pub omega_ratio: f64,
    pub created_at: String,
}

/// Response for list_recipes
#[derive(Debug, Serialize)]
pub struct ListRecipesResponse {
    pub recipes: Vec<RecipeSummary>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Current UTC time in the same layout SQLite's datetime('now') uses
fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// Reject lines the calculator cannot give a meaning to
pub fn validate_lines(lines: &[IngredientLine]) -> Result<(), String> {
    for line in lines {
        if line.code.trim().is_empty() {
            return Err(format!("Line {}: food code cannot be empty", line.line_no));
        }
        if !line.quantity_g.is_finite() || line.quantity_g <= 0.0 {
            return Err(format!(
                "Line {}: quantity must be a positive number of grams, got {}",
                line.line_no, line.quantity_g
            ));
        }
    }
    Ok(())
}

/// Trim food codes so they match the trimmed codes stored in the reference table
fn normalize_lines(lines: &[IngredientLine]) -> Vec<IngredientLine> {
    lines
        .iter()
        .map(|line| IngredientLine {
            code: line.code.trim().to_string(),
            ..line.clone()
        })
        .collect()
}

fn validate_yield(yield_servings: i64) -> Result<(), String> {
    if yield_servings < 1 {
        return Err(format!("yield_servings must be at least 1, got {}", yield_servings));
    }
    Ok(())
}

/// Load the reference table fresh for this request.
///
/// Unit conversions are read as well but aggregation works in grams only, so only
/// their count is reported.
fn load_reference(conn: &Connection) -> Result<(NutrientTable, usize), String> {
    let records = NutrientRecord::fetch_all(conn)
        .map_err(|e| format!("Failed to load nutrient records: {}", e))?;
    let conversions = UnitConversion::fetch_all(conn)
        .map_err(|e| format!("Failed to load unit conversions: {}", e))?;
    Ok((NutrientTable::from_records(records), conversions.len()))
}

/// Calculate nutrition without storing anything
pub fn calculate_recipe(
    db: &Database,
    yield_servings: i64,
    lines: &[IngredientLine],
) -> Result<CalculateRecipeResponse, String> {
    validate_yield(yield_servings)?;
    let lines = normalize_lines(lines);
    validate_lines(&lines)?;

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let (table, unit_conversions_loaded) = load_reference(&conn)?;

    let aggregation = aggregate(&lines, &table, None, &now_timestamp());
    let result = format_result(&aggregation.totals, yield_servings);

    Ok(CalculateRecipeResponse {
        result,
        rows: aggregation.rows,
        skipped: aggregation.skipped,
        reference_records: table.len(),
        unit_conversions_loaded,
    })
}

/// Calculate nutrition and store the recipe with its scaled rows
pub fn create_recipe(
    db: &Database,
    data: RecipeCreate,
    lines: &[IngredientLine],
) -> Result<CreateRecipeResponse, String> {
    let name = data.name.trim();
    if name.is_empty() {
        return Err("Recipe name cannot be empty".to_string());
    }
    validate_yield(data.yield_servings)?;
    let lines = normalize_lines(lines);
    validate_lines(&lines)?;

    let (table, _) = {
        let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
        load_reference(&conn)?
    };

    let created_at = now_timestamp();

    let (id, result, rows_saved, skipped) = db
        .with_transaction(|tx| {
            let id = Recipe::create(tx, &data, &created_at)?;

            let aggregation = aggregate(&lines, &table, Some(id), &created_at);
            let result = format_result(&aggregation.totals, data.yield_servings);

            Recipe::update_totals(tx, id, &result)?;
            let rows_saved = ScaledIngredientRow::insert_all(tx, id, &aggregation.rows)?;

            Ok((id, result, rows_saved, aggregation.skipped))
        })
        .map_err(|e| format!("Failed to create recipe: {}", e))?;

    tracing::info!(
        recipe_id = id,
        recipe = name,
        rows = rows_saved,
        skipped = skipped.len(),
        kcal = result.total.energy_kcal,
        "created recipe"
    );

    Ok(CreateRecipeResponse {
        id,
        name: name.to_string(),
        created_at,
        result,
        rows_saved,
        skipped,
    })
}

/// Re-derive the formatted result from stored rows, so it matches what creation returned
fn result_from_rows(rows: &[ScaledIngredientRow], yield_servings: i64) -> RecipeResult {
    let mut totals = RecipeTotals::zero();
    for row in rows {
        totals.fold(&row.nutrients, row.quantity_g);
    }
    format_result(&totals, yield_servings)
}

/// Get a recipe with its rows
pub fn get_recipe(db: &Database, id: i64) -> Result<Option<RecipeDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let recipe = Recipe::get_by_id(&conn, id)
        .map_err(|e| format!("Failed to get recipe: {}", e))?;

    let Some(recipe) = recipe else {
        return Ok(None);
    };

    let rows = ScaledIngredientRow::get_for_recipe(&conn, id)
        .map_err(|e| format!("Failed to get ingredient rows: {}", e))?;

    Ok(Some(RecipeDetail {
        id: recipe.id,
        name: recipe.name,
        yield_servings: recipe.yield_servings,
        method: recipe.method,
        notes: recipe.notes,
        created_at: recipe.created_at,
        result: result_from_rows(&rows, recipe.yield_servings),
        rows,
    }))
}

/// List recipes with an optional name filter
pub fn list_recipes(
    db: &Database,
    query: Option<&str>,
    limit: i64,
    offset: i64,
) -> Result<ListRecipesResponse, String> {
    let limit = limit.clamp(1, 200);
    let offset = offset.max(0);

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let recipes = Recipe::list(&conn, query, limit, offset)
        .map_err(|e| format!("Failed to list recipes: {}", e))?;
    let total = Recipe::count(&conn, query)
        .map_err(|e| format!("Failed to count recipes: {}", e))?;

    let recipes = recipes
        .into_iter()
        .map(|r| RecipeSummary {
            id: r.id,
            name: r.name,
            yield_servings: r.yield_servings,
            energy_kcal: r.totals.energy_kcal,
            omega_ratio: r.omega_ratio,
            created_at: r.created_at,
        })
        .collect();

    Ok(ListRecipesResponse {
        recipes,
        total,
        limit,
        offset,
    })
}

/// Delete a recipe and its rows. Returns false if it did not exist.
pub fn delete_recipe(db: &Database, id: i64) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let deleted = Recipe::delete(&conn, id)
        .map_err(|e| format!("Failed to delete recipe: {}", e))?;
    if deleted {
        tracing::info!(recipe_id = id, "deleted recipe");
    }
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NutrientRecordUpsert, Nutrients};
    use crate::tools::test_support::test_db;

    fn seed(db: &Database, code: &str, cells: &[(&str, &str)]) {
        let conn = db.get_conn().unwrap();
        NutrientRecord::upsert(
            &conn,
            &NutrientRecordUpsert {
                food_code: code.to_string(),
                food_name: format!("Food {}", code),
                cells: cells.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect(),
            },
        )
        .unwrap();
    }

    fn line(line_no: u32, code: &str, grams: f64) -> IngredientLine {
        IngredientLine {
            line_no,
            code: code.to_string(),
            name: String::new(),
            quantity_g: grams,
        }
    }

    fn recipe(name: &str, yield_servings: i64) -> RecipeCreate {
        RecipeCreate {
            name: name.to_string(),
            yield_servings,
            method: None,
            notes: None,
        }
    }

    #[test]
    fn test_end_to_end_energy() {
        let (db, _dir) = test_db();
        seed(&db, "A001", &[("Energy (Kcal)", "200")]);

        let lines = vec![line(1, "A001", 50.0), line(2, "A001", 50.0)];
        let created = create_recipe(&db, recipe("Rice bowl", 2), &lines).unwrap();

        assert_eq!(created.rows_saved, 2);
        assert_eq!(created.result.total.energy_kcal, 200.0);
        assert_eq!(created.result.per_serving.energy_kcal, 100.0);

        let detail = get_recipe(&db, created.id).unwrap().unwrap();
        assert_eq!(detail.rows.len(), 2);
        assert_eq!(detail.rows[0].nutrients.energy_kcal, 100.0);
        assert_eq!(detail.result, created.result);
    }

    #[test]
    fn test_missing_code_is_skipped_not_fatal() {
        let (db, _dir) = test_db();
        seed(&db, "B002", &[("Protein (g)", "20"), ("Omega 3 (mg)", "10"), ("Omega 6 (mg)", "5")]);

        let lines = vec![line(1, "B002", 100.0), line(2, "Q999", 100.0)];
        let created = create_recipe(&db, recipe("Salad", 1), &lines).unwrap();

        assert_eq!(created.rows_saved, 1);
        assert_eq!(created.skipped.len(), 1);
        assert_eq!(created.skipped[0].line_no, 2);
        assert_eq!(created.result.total.protein, 20.0);
        assert_eq!(created.result.omega_ratio, 2.0);
    }

    #[test]
    fn test_calculate_does_not_store() {
        let (db, _dir) = test_db();
        seed(&db, "A001", &[("Energy (Kcal)", "100")]);

        let preview = calculate_recipe(&db, 1, &[line(1, "A001", 250.0)]).unwrap();
        assert_eq!(preview.result.total.energy_kcal, 250.0);
        assert_eq!(preview.reference_records, 1);
        assert!(preview.rows[0].recipe_id.is_none());

        assert_eq!(list_recipes(&db, None, 50, 0).unwrap().total, 0);
    }

    #[test]
    fn test_padded_code_matches_reference_record() {
        let (db, _dir) = test_db();
        seed(&db, "A001", &[("Energy (Kcal)", "200")]);

        let preview = calculate_recipe(&db, 1, &[line(1, " A001 ", 50.0)]).unwrap();
        assert!(preview.skipped.is_empty());
        assert_eq!(preview.rows[0].food_code, "A001");
        assert_eq!(preview.result.total.energy_kcal, 100.0);

        let created = create_recipe(&db, recipe("Rice", 1), &[line(1, "A001\t", 100.0)]).unwrap();
        assert_eq!(created.rows_saved, 1);
        assert_eq!(created.result.total.energy_kcal, 200.0);
    }

    #[test]
    fn test_validation() {
        let (db, _dir) = test_db();
        assert!(create_recipe(&db, recipe("  ", 1), &[]).is_err());
        assert!(create_recipe(&db, recipe("Soup", 0), &[]).is_err());
        assert!(create_recipe(&db, recipe("Soup", 1), &[line(1, "A001", -5.0)]).is_err());
        assert!(create_recipe(&db, recipe("Soup", 1), &[line(1, "", 5.0)]).is_err());
        assert!(calculate_recipe(&db, 1, &[line(1, "A001", f64::NAN)]).is_err());
    }

    #[test]
    fn test_empty_recipe_is_all_zero() {
        let (db, _dir) = test_db();
        let created = create_recipe(&db, recipe("Water", 1), &[]).unwrap();
        assert_eq!(created.result.total, Nutrients::zero());
        assert_eq!(created.rows_saved, 0);
    }

    #[test]
    fn test_list_and_delete() {
        let (db, _dir) = test_db();
        let a = create_recipe(&db, recipe("Poha", 1), &[]).unwrap();
        create_recipe(&db, recipe("Idli", 4), &[]).unwrap();

        let listed = list_recipes(&db, Some("poha"), 10, 0).unwrap();
        assert_eq!(listed.total, 1);
        assert_eq!(listed.recipes[0].id, a.id);

        assert!(delete_recipe(&db, a.id).unwrap());
        assert!(!delete_recipe(&db, a.id).unwrap());
        assert!(get_recipe(&db, a.id).unwrap().is_none());
        assert_eq!(list_recipes(&db, None, 0, -3).unwrap().limit, 1);
    }
}
