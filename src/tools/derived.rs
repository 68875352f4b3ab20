//! Derived nutrient Tool
//!
//! Computes vitamin D, vitamin A and omega totals from raw composition values
//! supplied by the caller.

use rmcp::schemars;
use serde::{Deserialize, Serialize};

use crate::models::round_to;
use crate::nutrition::derived::{
    omega3_non_vegetarian, omega3_vegetarian, omega6_non_vegetarian, omega6_vegetarian,
    omega_ratio, vitamin_a_equivalent, vitamin_d_equivalent,
};

/// Raw composition values for one food, per 100 g
#[derive(Debug, Clone, Default, Deserialize, schemars::JsonSchema)]
pub struct DerivedNutrientInputs {
    pub food_code: String,
    #[serde(default)]
    pub chocal: f64,
    #[serde(default)]
    pub oh25d3: f64,
    #[serde(default)]
    pub retinol: f64,
    #[serde(default)]
    pub beta_carotene: f64,
    #[serde(default)]
    pub alpha_carotene: f64,
    /// Plant foods use ALA and linoleic acid alone
    #[serde(default = "default_vegetarian")]
    pub vegetarian: bool,
    #[serde(default)]
    pub ala: f64,
    #[serde(default)]
    pub linoleic: f64,
    #[serde(default)]
    pub epa: f64,
    #[serde(default)]
    pub dha: f64,
    pub dpa: Option<f64>,
    #[serde(default)]
    pub gamma_linolenic: f64,
    pub arachidonic: Option<f64>,
}

fn default_vegetarian() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedNutrients {
    pub food_code: String,
    pub vitamin_d_ug: f64,
    pub vitamin_a_ug: f64,
    pub omega_3: f64,
    pub omega_6: f64,
    pub omega_ratio: f64,
}

/// Compute derived nutrients. Negative or non-finite inputs are rejected.
pub fn compute_derived_nutrients(inputs: &DerivedNutrientInputs) -> Result<DerivedNutrients, String> {
    let checks = [
        ("chocal", Some(inputs.chocal)),
        ("oh25d3", Some(inputs.oh25d3)),
        ("retinol", Some(inputs.retinol)),
        ("beta_carotene", Some(inputs.beta_carotene)),
        ("alpha_carotene", Some(inputs.alpha_carotene)),
        ("ala", Some(inputs.ala)),
        ("linoleic", Some(inputs.linoleic)),
        ("epa", Some(inputs.epa)),
        ("dha", Some(inputs.dha)),
        ("dpa", inputs.dpa),
        ("gamma_linolenic", Some(inputs.gamma_linolenic)),
        ("arachidonic", inputs.arachidonic),
    ];
    for (name, value) in checks {
        if let Some(v) = value {
            if !v.is_finite() || v < 0.0 {
                return Err(format!("{} must be a non-negative number, got {}", name, v));
            }
        }
    }

    let food_code = inputs.food_code.trim();
    let (omega_3, omega_6) = if inputs.vegetarian {
        (omega3_vegetarian(inputs.ala), omega6_vegetarian(inputs.linoleic))
    } else {
        (
            omega3_non_vegetarian(inputs.ala, inputs.epa, inputs.dha, inputs.dpa),
            omega6_non_vegetarian(inputs.linoleic, inputs.gamma_linolenic, inputs.arachidonic),
        )
    };

    Ok(DerivedNutrients {
        food_code: food_code.to_string(),
        vitamin_d_ug: round_to(vitamin_d_equivalent(food_code, inputs.chocal, inputs.oh25d3), 2),
        vitamin_a_ug: round_to(
            vitamin_a_equivalent(inputs.retinol, inputs.beta_carotene, inputs.alpha_carotene),
            2,
        ),
        omega_3: round_to(omega_3, 2),
        omega_6: round_to(omega_6, 2),
        omega_ratio: omega_ratio(omega_3, omega_6),
    })
}
