//! Result formatting
//!
//! Rounds recipe totals to each nutrient's reporting precision and derives the
//! per-serving values and omega-3/omega-6 ratio.

use serde::{Deserialize, Serialize};

use crate::models::{round_to, Nutrients};
use super::aggregator::RecipeTotals;
use super::derived::omega_ratio;

/// Headline nutrients for one serving, 2 decimals each
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PerServing {
    pub energy_kcal: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrate: f64,
    pub total_fibre: f64,
}

impl PerServing {
    /// Divide totals by the declared yield.
    ///
    /// The yield is not checked: zero gives infinities (or NaN for empty totals).
    pub fn from_totals(totals: &Nutrients, yield_servings: i64) -> Self {
        let servings = yield_servings as f64;
        let per = |v: f64| round_to(v / servings, 2);
        Self {
            energy_kcal: per(totals.energy_kcal),
            protein: per(totals.protein),
            fat: per(totals.fat),
            carbohydrate: per(totals.carbohydrate),
            total_fibre: per(totals.total_fibre),
        }
    }
}

/// Formatted nutrition for a whole recipe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeResult {
    pub yield_servings: i64,
    /// Whole-recipe totals, rounded per field
    pub total: Nutrients,
    pub total_weight_g: f64,
    pub per_serving: PerServing,
    /// omega-3 / omega-6, 0 when the recipe has no omega-6.
    ///
    /// Serialized as a JSON number rounded to 2 decimals (`2.0`), not a padded string.
    pub omega_ratio: f64,
}

/// Round accumulated totals and derive per-serving values
pub fn format_result(totals: &RecipeTotals, yield_servings: i64) -> RecipeResult {
    let raw = &totals.nutrients;
    RecipeResult {
        yield_servings,
        total: raw.rounded(),
        total_weight_g: round_to(totals.total_weight_g, 2),
        per_serving: PerServing::from_totals(raw, yield_servings),
        omega_ratio: omega_ratio(raw.omega_3, raw.omega_6),
    }
}
