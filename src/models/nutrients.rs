//! Canonical nutrient field table
//!
//! Every nutrient the calculator knows about is listed exactly once in the
//! `nutrient_table!` invocation below: the Rust field, the column name used by the
//! reference nutrient spreadsheet, and the number of decimals used when reporting it.
//! The struct, scaling, summing and rounding are all generated from that one list, so
//! a field can never be scaled but forgotten when summing.

use serde::{Deserialize, Serialize};

/// Metadata for one nutrient column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NutrientField {
    /// snake_case key, also the SQL column name
    pub key: &'static str,
    /// Column header in the reference data source, e.g. "Thiamine, B1 (mg)"
    pub source_name: &'static str,
    /// Decimal places used when reporting this nutrient
    pub decimals: u32,
}

impl NutrientField {
    /// Find a field by its snake_case key or its source column name
    pub fn find(name: &str) -> Option<&'static NutrientField> {
        let name = name.trim();
        Nutrients::FIELDS
            .iter()
            .find(|f| f.key == name || f.source_name == name)
    }
}

/// Parse a raw cell from the reference data into a quantity.
///
/// Missing, blank, unparseable, non-finite and negative cells all become `0.0`.
/// Bad reference data is never an error, it simply contributes nothing.
pub fn parse_or_zero(raw: Option<&str>) -> f64 {
    match raw.map(str::trim).map(str::parse::<f64>) {
        Some(Ok(v)) if v.is_finite() && v > 0.0 => v,
        _ => 0.0,
    }
}

/// Round half away from zero to `decimals` places.
///
/// Non-finite input is returned unchanged.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    if !value.is_finite() {
        return value;
    }
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

fn cell_value<S: AsRef<str>>(cell: Option<S>) -> f64 {
    parse_or_zero(cell.as_ref().map(|s| s.as_ref()))
}

macro_rules! nutrient_table {
    ($( $field:ident => $source:literal, $decimals:literal; )+) => {
        /// Nutrient amounts, one field per canonical nutrient column
        #[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
        pub struct Nutrients {
            $( pub $field: f64, )+
        }

        impl Nutrients {
            /// The fixed field table, in canonical column order
            pub const FIELDS: &'static [NutrientField] = &[
                $( NutrientField { key: stringify!($field), source_name: $source, decimals: $decimals }, )+
            ];

            /// Multiply every field by `multiplier`
            pub fn scale(&self, multiplier: f64) -> Self {
                Self { $( $field: self.$field * multiplier, )+ }
            }

            /// Field-by-field sum
            pub fn add(&self, other: &Nutrients) -> Self {
                Self { $( $field: self.$field + other.$field, )+ }
            }

            /// Round each field to its reporting precision
            pub fn rounded(&self) -> Self {
                Self { $( $field: round_to(self.$field, $decimals), )+ }
            }

            /// Look up a field value by snake_case key
            pub fn get(&self, key: &str) -> Option<f64> {
                match key {
                    $( stringify!($field) => Some(self.$field), )+
                    _ => None,
                }
            }

            /// Values in `FIELDS` order
            pub fn values(&self) -> Vec<f64> {
                vec![ $( self.$field, )+ ]
            }

            /// Build from raw text cells, applying `parse_or_zero` to each one.
            ///
            /// `cell` is asked once per field and may return `None` for a missing cell.
            pub fn from_cells<F, S>(mut cell: F) -> Self
            where
                F: FnMut(&NutrientField) -> Option<S>,
                S: AsRef<str>,
            {
                Self {
                    $( $field: cell_value(cell(&NutrientField {
                        key: stringify!($field),
                        source_name: $source,
                        decimals: $decimals,
                    })), )+
                }
            }

            /// Build from already-numeric columns (e.g. a stored SQL row)
            pub fn try_from_columns<F, E>(mut column: F) -> Result<Self, E>
            where
                F: FnMut(&'static str) -> Result<f64, E>,
            {
                Ok(Self { $( $field: column(stringify!($field))?, )+ })
            }
        }
    };
}

nutrient_table! {
    protein => "Protein (g)", 2;
    fat => "Fat (g)", 2;
    total_fibre => "Total fibre (g)", 2;
    carbohydrate => "Carbohydrate (g)", 2;
    energy_kcal => "Energy (Kcal)", 2;
    energy_kj => "Energy (KJ)", 2;
    thiamine_b1 => "Thiamine, B1 (mg)", 3;
    riboflavin_b2 => "Riboflavin, B2 (mg)", 3;
    niacin_b3 => "Niacin, B3 (mg)", 2;
    pantothenic_acid_b5 => "Pantothenic Acid B5 (mg)", 2;
    pyridoxine_b6 => "Pyridoxine B6 (mg)", 3;
    biotin_b7 => "Biotin, B7 (µg)", 2;
    folate_b9 => "Folate, B9 (µg)", 2;
    vitamin_c => "Vitamin C (mg)", 2;
    vitamin_a => "Vitamin A (µg)", 2;
    vitamin_d => "Vitamin D (µg)", 2;
    vitamin_e => "VITE (mg)", 2;
    vitamin_k1 => "VITK1 (µg)", 2;
    iron => "Iron (Fe) mg", 2;
    calcium => "Calcium (Ca) mg", 2;
    magnesium => "Magnesium (Mg) mg", 2;
    zinc => "Zinc (Zn) mg", 2;
    selenium => "Selenium (Se) µg", 2;
    sodium => "Sodium (Na) mg", 2;
    potassium => "Potassium (K) mg", 2;
    phosphorus => "Phosphorus (P) mg", 2;
    cobalt => "Cobalt (Co) mg", 3;
    omega_3 => "Omega 3 (mg)", 2;
    omega_6 => "Omega 6 (mg)", 2;
    mufa => "MUFA", 2;
    pufa => "PUFA", 2;
    saturated_fat => "SATURATED FAT", 2;
    total_sugar => "TOTAL SUGAR (g)", 2;
}

impl Nutrients {
    /// All fields zero
    pub fn zero() -> Self {
        Self::default()
    }
}

impl std::ops::Add for Nutrients {
    type Output = Nutrients;

    fn add(self, other: Nutrients) -> Nutrients {
        Nutrients::add(&self, &other)
    }
}

impl std::ops::Mul<f64> for Nutrients {
    type Output = Nutrients;

    fn mul(self, multiplier: f64) -> Nutrients {
        self.scale(multiplier)
    }
}

impl std::iter::Sum for Nutrients {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Nutrients::zero(), |acc, n| acc + n)
    }
}
