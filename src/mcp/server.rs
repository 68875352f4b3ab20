//! Nutricalc MCP Server Implementation
//!
//! Exposes the recipe and reference-table tools over MCP.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::db::Database;
use crate::models::{NutrientRecordUpsert, RecipeCreate, UnitConversion};
use crate::nutrition::IngredientLine;
use crate::tools::derived::{self, DerivedNutrientInputs};
use crate::tools::nutrients;
use crate::tools::recipes;
use crate::tools::status::{StatusTracker, USAGE_INSTRUCTIONS};

/// Nutricalc MCP Service
#[derive(Clone)]
pub struct NutricalcService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    tool_router: ToolRouter<NutricalcService>,
}

impl NutricalcService {
    pub fn new(database_path: PathBuf, database: Database) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            database,
            tool_router: Self::tool_router(),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

fn not_found(what: &str, key: serde_json::Value) -> Result<CallToolResult, McpError> {
    to_json(&serde_json::json!({ "error": format!("{} not found", what), "key": key }))
}

// ============================================================================
// Recipe Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct IngredientLineParams {
    /// Line number within the recipe
    pub line_no: u32,
    /// Food code in the reference table
    pub code: String,
    /// Display name; the reference name is used when empty
    #[serde(default)]
    pub name: String,
    /// Quantity used, in grams
    pub quantity_g: f64,
}

impl From<IngredientLineParams> for IngredientLine {
    fn from(p: IngredientLineParams) -> Self {
        IngredientLine {
            line_no: p.line_no,
            code: p.code,
            name: p.name,
            quantity_g: p.quantity_g,
        }
    }
}

fn lines(params: Vec<IngredientLineParams>) -> Vec<IngredientLine> {
    params.into_iter().map(IngredientLine::from).collect()
}

fn default_yield() -> i64 { 1 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CalculateRecipeParams {
    #[serde(default = "default_yield")]
    pub yield_servings: i64,
    pub ingredients: Vec<IngredientLineParams>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CreateRecipeParams {
    pub name: String,
    #[serde(default = "default_yield")]
    pub yield_servings: i64,
    pub method: Option<String>,
    pub notes: Option<String>,
    pub ingredients: Vec<IngredientLineParams>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct RecipeIdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListRecipesParams {
    pub query: Option<String>,
    #[serde(default = "default_list_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_list_limit() -> i64 { 50 }

// ============================================================================
// Reference Table Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct FoodCodeParams {
    pub food_code: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SearchNutrientRecordsParams {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: i64,
}

fn default_search_limit() -> i64 { 20 }

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddNutrientRecordParams {
    pub food_code: String,
    #[serde(default)]
    pub food_name: String,
    /// Raw per-100g cells keyed by column name, e.g. {"Protein (g)": "24.6"}
    #[serde(default)]
    pub cells: HashMap<String, String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ImportNutrientRecordsParams {
    /// Path to a .csv or .json export
    pub file_path: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddUnitConversionParams {
    pub food_code: String,
    pub unit: String,
    pub grams_per_unit: f64,
    #[serde(default)]
    pub density: f64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListUnitConversionsParams {
    pub food_code: Option<String>,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl NutricalcService {
    // --- Status ---

    #[tool(description = "Get the current status of the nutricalc service including build info, database status, and process information")]
    async fn nutricalc_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&self.database);
        to_json(&status)
    }

    #[tool(description = "Get instructions for loading reference data and calculating recipe nutrition. Call this when unsure how to use the tools.")]
    fn usage_instructions(&self) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult::success(vec![Content::text(USAGE_INSTRUCTIONS)]))
    }

    // --- Recipes ---

    #[tool(description = "Calculate total and per-serving nutrition for a list of ingredient lines without storing anything. Lines with unknown food codes are skipped and reported.")]
    fn calculate_recipe_nutrition(&self, Parameters(p): Parameters<CalculateRecipeParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::calculate_recipe(&self.database, p.yield_servings, &lines(p.ingredients))
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Calculate nutrition for a recipe and store it with its scaled ingredient rows")]
    fn create_recipe(&self, Parameters(p): Parameters<CreateRecipeParams>) -> Result<CallToolResult, McpError> {
        let data = RecipeCreate {
            name: p.name,
            yield_servings: p.yield_servings,
            method: p.method,
            notes: p.notes,
        };
        let result = recipes::create_recipe(&self.database, data, &lines(p.ingredients))
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Get a stored recipe with its totals, per-serving values and scaled ingredient rows")]
    fn get_recipe(&self, Parameters(p): Parameters<RecipeIdParams>) -> Result<CallToolResult, McpError> {
        match recipes::get_recipe(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))? {
            Some(recipe) => to_json(&recipe),
            None => not_found("Recipe", p.id.into()),
        }
    }

    #[tool(description = "List stored recipes, newest first, with an optional name filter and pagination")]
    fn list_recipes(&self, Parameters(p): Parameters<ListRecipesParams>) -> Result<CallToolResult, McpError> {
        let result = recipes::list_recipes(&self.database, p.query.as_deref(), p.limit, p.offset)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete a stored recipe and its ingredient rows")]
    fn delete_recipe(&self, Parameters(p): Parameters<RecipeIdParams>) -> Result<CallToolResult, McpError> {
        let deleted = recipes::delete_recipe(&self.database, p.id).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&serde_json::json!({ "success": deleted, "id": p.id }))
    }

    // --- Reference table ---

    #[tool(description = "Get a reference nutrient record (per 100 g) and its unit conversions by food code")]
    fn get_nutrient_record(&self, Parameters(p): Parameters<FoodCodeParams>) -> Result<CallToolResult, McpError> {
        match nutrients::get_nutrient_record(&self.database, &p.food_code).map_err(|e| McpError::internal_error(e, None))? {
            Some(detail) => to_json(&detail),
            None => not_found("Nutrient record", p.food_code.into()),
        }
    }

    #[tool(description = "Search reference nutrient records by food name or code")]
    fn search_nutrient_records(&self, Parameters(p): Parameters<SearchNutrientRecordsParams>) -> Result<CallToolResult, McpError> {
        let result = nutrients::search_nutrient_records(&self.database, &p.query, p.limit)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Add or replace a reference nutrient record from raw per-100g cells keyed by column name")]
    fn add_nutrient_record(&self, Parameters(p): Parameters<AddNutrientRecordParams>) -> Result<CallToolResult, McpError> {
        let data = NutrientRecordUpsert {
            food_code: p.food_code,
            food_name: p.food_name,
            cells: p.cells,
        };
        let result = nutrients::add_nutrient_record(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Delete a reference nutrient record. Stored recipes keep their scaled rows.")]
    fn delete_nutrient_record(&self, Parameters(p): Parameters<FoodCodeParams>) -> Result<CallToolResult, McpError> {
        let deleted = nutrients::delete_nutrient_record(&self.database, &p.food_code)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&serde_json::json!({ "success": deleted, "food_code": p.food_code }))
    }

    #[tool(description = "Import reference nutrient records from a CSV or JSON file. Existing food codes are replaced.")]
    fn import_nutrient_records(&self, Parameters(p): Parameters<ImportNutrientRecordsParams>) -> Result<CallToolResult, McpError> {
        let result = nutrients::import_nutrient_records(&self.database, &p.file_path)
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "Add or replace a household unit conversion (grams per unit, density) for a food code")]
    fn add_unit_conversion(&self, Parameters(p): Parameters<AddUnitConversionParams>) -> Result<CallToolResult, McpError> {
        let data = UnitConversion {
            food_code: p.food_code,
            unit: p.unit,
            grams_per_unit: p.grams_per_unit,
            density: p.density,
        };
        let result = nutrients::add_unit_conversion(&self.database, data).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    #[tool(description = "List unit conversions, optionally for a single food code")]
    fn list_unit_conversions(&self, Parameters(p): Parameters<ListUnitConversionsParams>) -> Result<CallToolResult, McpError> {
        let result = nutrients::list_unit_conversions(&self.database, p.food_code.as_deref())
            .map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }

    // --- Derived ---

    #[tool(description = "Compute vitamin D, vitamin A, omega-3, omega-6 and the omega ratio from raw composition values")]
    fn compute_derived_nutrients(&self, Parameters(p): Parameters<DerivedNutrientInputs>) -> Result<CallToolResult, McpError> {
        let result = derived::compute_derived_nutrients(&p).map_err(|e| McpError::internal_error(e, None))?;
        to_json(&result)
    }
}

#[tool_handler]
impl ServerHandler for NutricalcService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "nutricalc".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Recipe Nutrition Calculator".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Nutricalc - recipe nutrition from a per-100g reference table. \
                 Call usage_instructions first. \
                 Reference data: import_nutrient_records, add/get/search/delete_nutrient_record, \
                 add_unit_conversion, list_unit_conversions. \
                 Recipes: calculate_recipe_nutrition (preview), create/get/list/delete_recipe. \
                 Derived values: compute_derived_nutrients."
                    .into(),
            ),
        }
    }
}
