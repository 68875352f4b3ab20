//! Data models
//!
//! Rust structs for the reference nutrient data and stored recipes.

mod nutrient_record;
mod nutrients;
mod recipe;
mod recipe_ingredient;
mod unit_conversion;

pub use nutrient_record::{NutrientRecord, NutrientRecordUpsert};
pub use nutrients::{parse_or_zero, round_to, NutrientField, Nutrients};
pub use recipe::{Recipe, RecipeCreate};
pub use recipe_ingredient::ScaledIngredientRow;
pub use unit_conversion::UnitConversion;
