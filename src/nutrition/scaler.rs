//! Quantity scaling
//!
//! Reference values are per 100 g; scaling to a portion is a single linear multiply.

use crate::models::{NutrientRecord, Nutrients};

/// Quantity the reference table is normalized to
pub const REFERENCE_GRAMS: f64 = 100.0;

/// Nutrients contained in `grams` of the food described by `record`
pub fn scale_record(record: &NutrientRecord, grams: f64) -> Nutrients {
    record.nutrients.scale(grams / REFERENCE_GRAMS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> NutrientRecord {
        let mut nutrients = Nutrients::zero();
        nutrients.energy_kcal = 200.0;
        nutrients.protein = 7.3;
        nutrients.thiamine_b1 = 0.41;
        nutrients.cobalt = 0.003;
        NutrientRecord {
            food_code: "A001".to_string(),
            food_name: "Rice".to_string(),
            nutrients,
        }
    }

    #[test]
    fn test_scale_half_portion() {
        let scaled = scale_record(&record(), 50.0);
        assert_eq!(scaled.energy_kcal, 100.0);
        assert!((scaled.protein - 3.65).abs() < 1e-9);
        assert_eq!(scaled.fat, 0.0);
    }

    #[test]
    fn test_scaling_is_linear() {
        let base = record();
        for q in [1.0, 12.5, 100.0, 333.3, 2500.0] {
            let back = scale_record(&base, q).scale(REFERENCE_GRAMS / q);
            for (a, b) in back.values().iter().zip(base.nutrients.values()) {
                assert!((a - b).abs() < 1e-9, "q={} {} != {}", q, a, b);
            }
        }
    }

    #[test]
    fn test_zero_quantity_scales_to_zero() {
        assert_eq!(scale_record(&record(), 0.0), Nutrients::zero());
    }
}
