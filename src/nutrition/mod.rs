//! Nutrition calculation module
//!
//! Scales per-100g reference values to ingredient quantities, sums them into recipe
//! totals and formats the result. Everything here is synchronous and side-effect free.

pub mod aggregator;
pub mod derived;
pub mod formatter;
pub mod scaler;

pub use aggregator::{aggregate, Aggregation, IngredientLine, NutrientLookup, NutrientTable, RecipeTotals, SkippedLine};
pub use derived::{
    omega3_non_vegetarian, omega3_vegetarian, omega6_non_vegetarian, omega6_vegetarian,
    omega_ratio, vitamin_a_equivalent, vitamin_d_equivalent,
};
pub use formatter::{format_result, PerServing, RecipeResult};
pub use scaler::{scale_record, REFERENCE_GRAMS};
