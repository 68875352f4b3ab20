//! Recipe aggregation
//!
//! Folds a list of ingredient lines into recipe totals, producing one scaled row per
//! line that matched a reference record.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::models::{NutrientRecord, Nutrients, ScaledIngredientRow};
use super::scaler::scale_record;

/// One caller-supplied ingredient line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngredientLine {
    pub line_no: u32,
    /// Food code, foreign key into the reference table
    pub code: String,
    /// Display name
    #[serde(default)]
    pub name: String,
    pub quantity_g: f64,
}

/// Source of reference records for aggregation
pub trait NutrientLookup {
    fn lookup(&self, food_code: &str) -> Option<&NutrientRecord>;
}

impl NutrientLookup for HashMap<String, NutrientRecord> {
    fn lookup(&self, food_code: &str) -> Option<&NutrientRecord> {
        self.get(food_code)
    }
}

/// Reference records indexed by food code, built once per request
#[derive(Debug, Clone, Default)]
pub struct NutrientTable {
    records: HashMap<String, NutrientRecord>,
}

impl NutrientTable {
    /// Index records by code. A later record with the same code replaces an earlier one.
    pub fn from_records(records: Vec<NutrientRecord>) -> Self {
        let records = records
            .into_iter()
            .map(|r| (r.food_code.clone(), r))
            .collect();
        Self { records }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl NutrientLookup for NutrientTable {
    fn lookup(&self, food_code: &str) -> Option<&NutrientRecord> {
        self.records.get(food_code)
    }
}

/// Running recipe totals. Owned by a single aggregation call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct RecipeTotals {
    pub nutrients: Nutrients,
    /// Sum of the gram quantities of the lines that were used
    pub total_weight_g: f64,
}

impl RecipeTotals {
    /// Empty totals with zero weight
    pub fn zero() -> Self {
        Self::default()
    }

    /// Add one scaled ingredient
    pub fn fold(&mut self, scaled: &Nutrients, grams: f64) {
        self.nutrients = self.nutrients.add(scaled);
        self.total_weight_g += grams;
    }
}

/// An ingredient line whose food code had no reference record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedLine {
    pub line_no: u32,
    pub food_code: String,
}

/// Output of `aggregate`
#[derive(Debug, Clone, Default, Serialize)]
pub struct Aggregation {
    pub totals: RecipeTotals,
    /// One row per matched line, in input order
    pub rows: Vec<ScaledIngredientRow>,
    pub skipped: Vec<SkippedLine>,
}

/// Scale every line against `lookup` and sum into fresh totals.
///
/// Lines whose food code is unknown are left out of both the totals and the rows.
/// Duplicate codes are not merged; each line contributes separately.
pub fn aggregate<L>(
    lines: &[IngredientLine],
    lookup: &L,
    recipe_id: Option<i64>,
    recorded_at: &str,
) -> Aggregation
where
    L: NutrientLookup + ?Sized,
{
    let mut out = Aggregation::default();

    for line in lines {
        let Some(record) = lookup.lookup(&line.code) else {
            tracing::warn!(line_no = line.line_no, code = %line.code, "no reference record, skipping line");
            out.skipped.push(SkippedLine {
                line_no: line.line_no,
                food_code: line.code.clone(),
            });
            continue;
        };

        let scaled = scale_record(record, line.quantity_g);
        out.totals.fold(&scaled, line.quantity_g);

        tracing::debug!(
            line_no = line.line_no,
            code = %line.code,
            grams = line.quantity_g,
            kcal = scaled.energy_kcal,
            "aggregated line"
        );

        let food_name = if line.name.trim().is_empty() {
            record.food_name.clone()
        } else {
            line.name.clone()
        };

        out.rows.push(ScaledIngredientRow {
            recipe_id,
            recorded_at: recorded_at.to_string(),
            line_no: line.line_no,
            food_code: line.code.clone(),
            food_name,
            quantity_g: line.quantity_g,
            nutrients: scaled,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2026-01-01 08:00:00";

    fn record(code: &str, kcal: f64, protein: f64) -> NutrientRecord {
        let mut nutrients = Nutrients::zero();
        nutrients.energy_kcal = kcal;
        nutrients.protein = protein;
        nutrients.omega_3 = 4.0;
        nutrients.omega_6 = 8.0;
        NutrientRecord {
            food_code: code.to_string(),
            food_name: format!("Food {}", code),
            nutrients,
        }
    }

    fn line(line_no: u32, code: &str, grams: f64) -> IngredientLine {
        IngredientLine {
            line_no,
            code: code.to_string(),
            name: String::new(),
            quantity_g: grams,
        }
    }

    fn table() -> NutrientTable {
        NutrientTable::from_records(vec![record("A001", 200.0, 10.0), record("M002", 50.0, 1.0)])
    }

    #[test]
    fn test_empty_list_yields_zero_totals() {
        let agg = aggregate(&[], &table(), None, TS);
        assert_eq!(agg.totals, RecipeTotals::zero());
        assert!(agg.rows.is_empty());
        assert!(agg.skipped.is_empty());
    }

    #[test]
    fn test_two_half_portions_sum() {
        let lines = vec![line(1, "A001", 50.0), line(2, "A001", 50.0)];
        let agg = aggregate(&lines, &table(), Some(7), TS);

        assert_eq!(agg.rows.len(), 2);
        assert_eq!(agg.rows[0].nutrients.energy_kcal, 100.0);
        assert_eq!(agg.totals.nutrients.energy_kcal, 200.0);
        assert_eq!(agg.totals.total_weight_g, 100.0);
        assert!(agg.rows.iter().all(|r| r.recipe_id == Some(7) && r.recorded_at == TS));
    }

    #[test]
    fn test_unknown_code_is_skipped() {
        let lines = vec![line(1, "A001", 100.0), line(2, "X404", 300.0), line(3, "M002", 200.0)];
        let agg = aggregate(&lines, &table(), None, TS);

        assert_eq!(agg.rows.len(), 2);
        assert_eq!(agg.totals.nutrients.energy_kcal, 300.0);
        assert_eq!(agg.totals.total_weight_g, 300.0);
        assert_eq!(
            agg.skipped,
            vec![SkippedLine { line_no: 2, food_code: "X404".to_string() }]
        );
    }

    #[test]
    fn test_totals_are_order_independent_rows_are_not() {
        let forward = vec![line(1, "A001", 30.0), line(2, "M002", 70.0), line(3, "A001", 15.0)];
        let mut reversed = forward.clone();
        reversed.reverse();

        let a = aggregate(&forward, &table(), None, TS);
        let b = aggregate(&reversed, &table(), None, TS);

        for (x, y) in a.totals.nutrients.values().iter().zip(b.totals.nutrients.values()) {
            assert!((x - y).abs() < 1e-9);
        }
        let order_a: Vec<_> = a.rows.iter().map(|r| r.line_no).collect();
        let order_b: Vec<_> = b.rows.iter().map(|r| r.line_no).collect();
        assert_eq!(order_a, vec![1, 2, 3]);
        assert_eq!(order_b, vec![3, 2, 1]);
    }

    #[test]
    fn test_totals_never_decrease() {
        let lines = vec![line(1, "A001", 10.0), line(2, "M002", 20.0), line(3, "A001", 5.0)];
        let t = table();
        let mut previous = RecipeTotals::zero();
        for n in 1..=lines.len() {
            let totals = aggregate(&lines[..n], &t, None, TS).totals;
            for (now, before) in totals.nutrients.values().iter().zip(previous.nutrients.values()) {
                assert!(*now >= before);
            }
            previous = totals;
        }
    }

    #[test]
    fn test_row_name_falls_back_to_reference_name() {
        let mut named = line(1, "A001", 10.0);
        named.name = "Basmati".to_string();
        let lines = vec![named, line(2, "M002", 10.0)];
        let agg = aggregate(&lines, &table(), None, TS);

        assert_eq!(agg.rows[0].food_name, "Basmati");
        assert_eq!(agg.rows[1].food_name, "Food M002");
    }

    #[test]
    fn test_hash_map_lookup() {
        let mut map = HashMap::new();
        map.insert("A001".to_string(), record("A001", 100.0, 0.0));
        let agg = aggregate(&[line(1, "A001", 200.0)], &map, None, TS);
        assert_eq!(agg.totals.nutrients.energy_kcal, 200.0);
    }

    #[test]
    fn test_table_later_duplicate_wins() {
        let t = NutrientTable::from_records(vec![record("A001", 100.0, 0.0), record("A001", 300.0, 0.0)]);
        assert_eq!(t.len(), 1);
        assert_eq!(t.lookup("A001").unwrap().nutrients.energy_kcal, 300.0);
    }
}
