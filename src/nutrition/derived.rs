//! Derived nutrient formulas
//!
//! Pure functions combining raw composition values into vitamin D, vitamin A and
//! omega-3/omega-6 totals. None of them touch the database.

use crate::models::round_to;

/// Food codes whose vitamin D is reported as D2 only
const D2_RANGE: (&str, &str) = ("A001", "L004");
/// Food codes whose vitamin D combines D2 with 25-hydroxy-D3
const D3_RANGE: (&str, &str) = ("M001", "S010");
/// 25-OH-D3 counts five times toward the vitamin D equivalent
const OH25D3_FACTOR: f64 = 5.0;

fn in_range(code: &str, (low, high): (&str, &str)) -> bool {
    low <= code && code <= high
}

/// Vitamin D equivalent (µg) for a food.
///
/// Ranges are closed and compared as strings, so they only make sense for fixed-width
/// codes of one letter and three digits. Codes outside both ranges yield zero.
pub fn vitamin_d_equivalent(food_code: &str, chocal: f64, oh25d3: f64) -> f64 {
    if in_range(food_code, D2_RANGE) {
        chocal
    } else if in_range(food_code, D3_RANGE) {
        chocal + OH25D3_FACTOR * oh25d3
    } else {
        0.0
    }
}

/// Retinol activity equivalent: retinol + β-carotene/12 + α-carotene/24
pub fn vitamin_a_equivalent(retinol: f64, beta_carotene: f64, alpha_carotene: f64) -> f64 {
    retinol + beta_carotene / 12.0 + alpha_carotene / 24.0
}

/// Plant sources report omega-3 as alpha-linolenic acid alone
pub fn omega3_vegetarian(alpha_linolenic: f64) -> f64 {
    alpha_linolenic
}

/// Plant sources report omega-6 as linoleic acid alone
pub fn omega6_vegetarian(linoleic: f64) -> f64 {
    linoleic
}

/// ALA + EPA + DHA, plus DPA when the source reports it
pub fn omega3_non_vegetarian(ala: f64, epa: f64, dha: f64, dpa: Option<f64>) -> f64 {
    ala + epa + dha + dpa.unwrap_or(0.0)
}

/// Linoleic + gamma-linolenic, plus arachidonic acid when the source reports it
pub fn omega6_non_vegetarian(linoleic: f64, gamma_linolenic: f64, arachidonic: Option<f64>) -> f64 {
    linoleic + gamma_linolenic + arachidonic.unwrap_or(0.0)
}

/// omega-3 / omega-6 rounded to 2 decimals, or 0 when there is no omega-6
pub fn omega_ratio(omega3: f64, omega6: f64) -> f64 {
    if omega6 > 0.0 {
        round_to(omega3 / omega6, 2)
    } else {
        0.0
    }
}
