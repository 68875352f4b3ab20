//! Nutrient reference Tools
//!
//! Maintain the per-100g reference table and the unit conversion table: lookup,
//! search, single-row upsert, delete, and bulk import from a spreadsheet export.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use crate::db::Database;
use crate::models::{NutrientField, NutrientRecord, NutrientRecordUpsert, UnitConversion};

/// Column holding the food code in a spreadsheet export
pub const FOOD_CODE_COLUMN: &str = "Food code";
/// Column holding the food name in a spreadsheet export
pub const FOOD_NAME_COLUMN: &str = "Food name";

/// A reference record with its unit conversions
#[derive(Debug, Serialize)]
pub struct NutrientRecordDetail {
    pub record: NutrientRecord,
    pub unit_conversions: Vec<UnitConversion>,
}

/// Compact search hit
#[derive(Debug, Serialize)]
pub struct NutrientRecordSummary {
    pub food_code: String,
    pub food_name: String,
    pub energy_kcal: f64,
    pub protein: f64,
    pub fat: f64,
    pub carbohydrate: f64,
}

/// Response for search_nutrient_records
#[derive(Debug, Serialize)]
pub struct SearchNutrientRecordsResponse {
    pub records: Vec<NutrientRecordSummary>,
    pub count: usize,
}

/// Response for add_nutrient_record
#[derive(Debug, Serialize)]
pub struct AddNutrientRecordResponse {
    pub record: NutrientRecord,
    /// Supplied columns that are not nutrient columns and were ignored
    pub ignored_columns: Vec<String>,
}

/// Response for import_nutrient_records
#[derive(Debug, Serialize)]
pub struct ImportNutrientRecordsResponse {
    pub file_path: String,
    pub total_rows: usize,
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<String>,
    /// Header columns that matched no nutrient and were ignored
    pub ignored_columns: Vec<String>,
    pub total_records: i64,
}

fn is_code_column(name: &str) -> bool {
    let name = name.trim();
    name.eq_ignore_ascii_case(FOOD_CODE_COLUMN) || name.eq_ignore_ascii_case("food_code")
}

fn is_name_column(name: &str) -> bool {
    let name = name.trim();
    name.eq_ignore_ascii_case(FOOD_NAME_COLUMN) || name.eq_ignore_ascii_case("food_name")
}

/// Get a reference record by food code
pub fn get_nutrient_record(db: &Database, food_code: &str) -> Result<Option<NutrientRecordDetail>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let record = NutrientRecord::get_by_code(&conn, food_code.trim())
        .map_err(|e| format!("Failed to get nutrient record: {}", e))?;

    match record {
        Some(record) => {
            let unit_conversions = UnitConversion::list_for_code(&conn, &record.food_code)
                .map_err(|e| format!("Failed to get unit conversions: {}", e))?;
            Ok(Some(NutrientRecordDetail { record, unit_conversions }))
        }
        None => Ok(None),
    }
}

/// Search reference records by name or code
pub fn search_nutrient_records(db: &Database, query: &str, limit: i64) -> Result<SearchNutrientRecordsResponse, String> {
    let limit = limit.clamp(1, 200);
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;

    let records = NutrientRecord::search(&conn, query.trim(), limit)
        .map_err(|e| format!("Failed to search nutrient records: {}", e))?;

    let records: Vec<_> = records
        .into_iter()
        .map(|r| NutrientRecordSummary {
            food_code: r.food_code,
            food_name: r.food_name,
            energy_kcal: r.nutrients.energy_kcal,
            protein: r.nutrients.protein,
            fat: r.nutrients.fat,
            carbohydrate: r.nutrients.carbohydrate,
        })
        .collect();
    let count = records.len();

    Ok(SearchNutrientRecordsResponse { records, count })
}

/// Insert or replace one reference record
pub fn add_nutrient_record(db: &Database, data: NutrientRecordUpsert) -> Result<AddNutrientRecordResponse, String> {
    if data.food_code.trim().is_empty() {
        return Err("Food code cannot be empty".to_string());
    }

    let ignored_columns: Vec<String> = data.unknown_columns().into_iter().map(String::from).collect();

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    let record = NutrientRecord::upsert(&conn, &data)
        .map_err(|e| format!("Failed to save nutrient record: {}", e))?;

    Ok(AddNutrientRecordResponse { record, ignored_columns })
}

/// Delete a reference record. Stored recipes keep their scaled rows.
pub fn delete_nutrient_record(db: &Database, food_code: &str) -> Result<bool, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    NutrientRecord::delete(&conn, food_code.trim())
        .map_err(|e| format!("Failed to delete nutrient record: {}", e))
}

/// Insert or replace a unit conversion
pub fn add_unit_conversion(db: &Database, data: UnitConversion) -> Result<UnitConversion, String> {
    if data.food_code.trim().is_empty() || data.unit.trim().is_empty() {
        return Err("Food code and unit are required".to_string());
    }
    if !data.grams_per_unit.is_finite() || data.grams_per_unit < 0.0 {
        return Err(format!("grams_per_unit must be a non-negative number, got {}", data.grams_per_unit));
    }
    if !data.density.is_finite() || data.density < 0.0 {
        return Err(format!("density must be a non-negative number, got {}", data.density));
    }

    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    UnitConversion::upsert(&conn, &data)
        .map_err(|e| format!("Failed to save unit conversion: {}", e))?;

    Ok(UnitConversion {
        food_code: data.food_code.trim().to_string(),
        unit: data.unit.trim().to_lowercase(),
        ..data
    })
}

/// List unit conversions, optionally for one food code
pub fn list_unit_conversions(db: &Database, food_code: Option<&str>) -> Result<Vec<UnitConversion>, String> {
    let conn = db.get_conn().map_err(|e| format!("Database error: {}", e))?;
    match food_code {
        Some(code) => UnitConversion::list_for_code(&conn, code.trim()),
        None => UnitConversion::fetch_all(&conn),
    }
    .map_err(|e| format!("Failed to list unit conversions: {}", e))
}

// ============================================================================
// Import
// ============================================================================

/// One CSV record and the line it starts on
#[derive(Debug)]
struct CsvRecord {
    line_no: usize,
    fields: Vec<String>,
    /// The file ended inside a quoted field
    unterminated: bool,
}

fn push_record(records: &mut Vec<CsvRecord>, line_no: usize, fields: Vec<String>, unterminated: bool) {
    let blank = fields.len() == 1 && fields[0].trim().is_empty();
    if unterminated || !blank {
        records.push(CsvRecord { line_no, fields, unterminated });
    }
}

/// Split CSV text into records, honoring double-quoted fields and `""` escapes.
///
/// A line break inside quotes belongs to the field; only one outside quotes ends the
/// record. Blank lines are dropped.
fn read_csv_records(content: &str) -> Vec<CsvRecord> {
    let mut records = Vec::new();
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut line_no = 1;
    let mut start_line = 1;
    let mut chars = content.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            '\r' if !in_quotes && chars.peek() == Some(&'\n') => {}
            '\n' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
                push_record(&mut records, start_line, std::mem::take(&mut fields), false);
                line_no += 1;
                start_line = line_no;
            }
            '\n' => {
                current.push(c);
                line_no += 1;
            }
            _ => current.push(c),
        }
    }

    if in_quotes || !current.is_empty() || !fields.is_empty() {
        fields.push(current);
        push_record(&mut records, start_line, fields, in_quotes);
    }
    records
}

/// Parsed rows plus per-row problems, before anything touches the database
#[derive(Debug, Default)]
struct ParsedImport {
    rows: Vec<NutrientRecordUpsert>,
    total_rows: usize,
    errors: Vec<String>,
    ignored_columns: Vec<String>,
}

fn parse_csv(content: &str) -> Result<ParsedImport, String> {
    let mut records = read_csv_records(content.trim_start_matches('\u{feff}')).into_iter();

    let header = records.next().ok_or("File is empty")?;
    if header.unterminated {
        return Err("Header has an unterminated quoted field".to_string());
    }
    let header: Vec<String> = header.fields.into_iter().map(|h| h.trim().to_string()).collect();

    let code_idx = header
        .iter()
        .position(|h| is_code_column(h))
        .ok_or_else(|| format!("Header has no '{}' column", FOOD_CODE_COLUMN))?;
    let name_idx = header.iter().position(|h| is_name_column(h));

    let mut parsed = ParsedImport {
        ignored_columns: header
            .iter()
            .enumerate()
            .filter(|(i, h)| *i != code_idx && Some(*i) != name_idx && NutrientField::find(h).is_none())
            .map(|(_, h)| h.clone())
            .collect(),
        ..Default::default()
    };

    for record in records {
        parsed.total_rows += 1;
        if record.unterminated {
            parsed.errors.push(format!(
                "Row {}: quoted field is never closed, rest of file ignored",
                record.line_no
            ));
            continue;
        }
        let fields = record.fields;

        let code = fields.get(code_idx).map(|s| s.trim()).unwrap_or("");
        if code.is_empty() {
            parsed.errors.push(format!("Row {}: missing food code", record.line_no));
            continue;
        }

        let mut cells = HashMap::new();
        for (i, column) in header.iter().enumerate() {
            if let (Some(field), Some(value)) = (NutrientField::find(column), fields.get(i)) {
                cells.insert(field.source_name.to_string(), value.trim().to_string());
            }
        }

        parsed.rows.push(NutrientRecordUpsert {
            food_code: code.to_string(),
            food_name: name_idx
                .and_then(|i| fields.get(i))
                .map(|s| s.trim().to_string())
                .unwrap_or_default(),
            cells,
        });
    }

    Ok(parsed)
}

fn json_cell(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn parse_json(content: &str) -> Result<ParsedImport, String> {
    let items: Vec<serde_json::Map<String, serde_json::Value>> = serde_json::from_str(content)
        .map_err(|e| format!("Expected a JSON array of objects: {}", e))?;

    let mut parsed = ParsedImport::default();
    let mut ignored = std::collections::BTreeSet::new();

    for (idx, item) in items.iter().enumerate() {
        parsed.total_rows += 1;

        let code = item
            .iter()
            .find(|(k, _)| is_code_column(k))
            .and_then(|(_, v)| json_cell(v))
            .map(|s| s.trim().to_string())
            .unwrap_or_default();
        if code.is_empty() {
            parsed.errors.push(format!("Item {}: missing food code", idx + 1));
            continue;
        }

        let food_name = item
            .iter()
            .find(|(k, _)| is_name_column(k))
            .and_then(|(_, v)| json_cell(v))
            .unwrap_or_default();

        let mut cells = HashMap::new();
        for (key, value) in item {
            if is_code_column(key) || is_name_column(key) {
                continue;
            }
            match NutrientField::find(key) {
                Some(field) => {
                    if let Some(text) = json_cell(value) {
                        cells.insert(field.source_name.to_string(), text);
                    }
                }
                None => {
                    ignored.insert(key.clone());
                }
            }
        }

        parsed.rows.push(NutrientRecordUpsert {
            food_code: code,
            food_name: food_name.trim().to_string(),
            cells,
        });
    }

    parsed.ignored_columns = ignored.into_iter().collect();
    Ok(parsed)
}

/// Import reference records from a CSV or JSON export.
///
/// CSV headers (and JSON object keys) use the reference column names, e.g.
/// "Food code", "Food name", "Energy (Kcal)". Existing codes are replaced. Rows without
/// a food code are reported and skipped; bad numeric cells are kept and read as zero.
pub fn import_nutrient_records(db: &Database, file_path: &str) -> Result<ImportNutrientRecordsResponse, String> {
    let content = std::fs::read_to_string(file_path)
        .map_err(|e| format!("Failed to read file '{}': {}", file_path, e))?;

    let is_json = Path::new(file_path)
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let parsed = if is_json { parse_json(&content)? } else { parse_csv(&content)? };

    for error in &parsed.errors {
        tracing::warn!(file = file_path, "{}", error);
    }

    let rows = &parsed.rows;
    let (imported, total_records) = db
        .with_transaction(|tx| {
            for row in rows {
                NutrientRecord::upsert(tx, row)?;
            }
            Ok((rows.len(), NutrientRecord::count(tx)?))
        })
        .map_err(|e| format!("Failed to import nutrient records: {}", e))?;

    tracing::info!(
        file = file_path,
        imported,
        skipped = parsed.errors.len(),
        total_records,
        "imported nutrient records"
    );

    Ok(ImportNutrientRecordsResponse {
        file_path: file_path.to_string(),
        total_rows: parsed.total_rows,
        imported,
        skipped: parsed.errors.len(),
        errors: parsed.errors,
        ignored_columns: parsed.ignored_columns,
        total_records,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::test_db;

    #[test]
    fn test_read_csv_records_with_quotes() {
        let records = read_csv_records("A001,\"Rice, raw\",\"\"\"\"\r\n\na,,b");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].fields, vec!["A001", "Rice, raw", "\""]);
        assert_eq!(records[1].fields, vec!["a", "", "b"]);
        assert_eq!(records[1].line_no, 3);
        assert!(!records[1].unterminated);
    }

    #[test]
    fn test_import_csv_with_line_break_in_quoted_name() {
        let (db, dir) = test_db();
        let path = dir.path().join("multiline.csv");
        std::fs::write(
            &path,
            "Food code,Food name,Energy (Kcal)\nA001,\"Rice\nraw\",356\nB002,Dal,340\n",
        )
        .unwrap();

        let result = import_nutrient_records(&db, path.to_str().unwrap()).unwrap();
        assert_eq!(result.total_rows, 2);
        assert_eq!(result.imported, 2);
        assert!(result.errors.is_empty());
        assert_eq!(result.total_records, 2);

        let rice = get_nutrient_record(&db, "A001").unwrap().unwrap().record;
        assert_eq!(rice.food_name, "Rice\nraw");
        assert_eq!(rice.nutrients.energy_kcal, 356.0);
        assert!(get_nutrient_record(&db, "raw,356").unwrap().is_none());
    }

    #[test]
    fn test_import_csv_unclosed_quote_is_reported() {
        let (db, dir) = test_db();
        let path = dir.path().join("unclosed.csv");
        std::fs::write(&path, "Food code,Food name,Energy (Kcal)\nA001,Rice,356\nB002,\"Dal,340\nC003,Milk,60\n")
            .unwrap();

        let result = import_nutrient_records(&db, path.to_str().unwrap()).unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(result.skipped, 1);
        assert!(result.errors[0].starts_with("Row 3:"));
        assert!(get_nutrient_record(&db, "B002").unwrap().is_none());
    }

    #[test]
    fn test_import_csv() {
        let (db, dir) = test_db();
        let path = dir.path().join("nutrients.csv");
        std::fs::write(
            &path,
            "\u{feff}Food code,Food name,Energy (Kcal),\"Thiamine, B1 (mg)\",Water (g)\n\
             A001,\"Rice, raw\",356,0.05,12\n\
             ,Nameless,10,0,0\n\
             \n\
             M003,Egg,tr,0.1,75\n",
        )
        .unwrap();

        let result = import_nutrient_records(&db, path.to_str().unwrap()).unwrap();
        assert_eq!(result.total_rows, 3);
        assert_eq!(result.imported, 2);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.ignored_columns, vec!["Water (g)"]);
        assert_eq!(result.total_records, 2);

        let rice = get_nutrient_record(&db, "A001").unwrap().unwrap().record;
        assert_eq!(rice.food_name, "Rice, raw");
        assert_eq!(rice.nutrients.energy_kcal, 356.0);
        assert_eq!(rice.nutrients.thiamine_b1, 0.05);

        let egg = get_nutrient_record(&db, "M003").unwrap().unwrap().record;
        assert_eq!(egg.nutrients.energy_kcal, 0.0);
    }

    #[test]
    fn test_import_json() {
        let (db, dir) = test_db();
        let path = dir.path().join("nutrients.json");
        std::fs::write(
            &path,
            r#"[
                {"Food code": "B002", "Food name": "Lentils", "Protein (g)": 24.6, "Fat (g)": "0.7", "Notes": "x"},
                {"Food name": "No code"}
            ]"#,
        )
        .unwrap();

        let result = import_nutrient_records(&db, path.to_str().unwrap()).unwrap();
        assert_eq!(result.imported, 1);
        assert_eq!(result.skipped, 1);
        assert_eq!(result.ignored_columns, vec!["Notes"]);

        let lentils = get_nutrient_record(&db, "B002").unwrap().unwrap().record;
        assert_eq!(lentils.nutrients.protein, 24.6);
        assert_eq!(lentils.nutrients.fat, 0.7);
    }

    #[test]
    fn test_import_requires_code_column() {
        let (db, dir) = test_db();
        let path = dir.path().join("bad.csv");
        std::fs::write(&path, "Name,Energy (Kcal)\nRice,356\n").unwrap();
        assert!(import_nutrient_records(&db, path.to_str().unwrap()).is_err());
        assert!(import_nutrient_records(&db, "/nonexistent/file.csv").is_err());
    }

    #[test]
    fn test_add_search_delete() {
        let (db, _dir) = test_db();
        let mut cells = HashMap::new();
        cells.insert("Energy (Kcal)".to_string(), "23".to_string());
        cells.insert("Oxalate".to_string(), "970".to_string());

        let added = add_nutrient_record(
            &db,
            NutrientRecordUpsert {
                food_code: "D004".to_string(),
                food_name: "Spinach".to_string(),
                cells,
            },
        )
        .unwrap();
        assert_eq!(added.record.nutrients.energy_kcal, 23.0);
        assert_eq!(added.ignored_columns, vec!["Oxalate"]);

        let found = search_nutrient_records(&db, "spin", 10).unwrap();
        assert_eq!(found.count, 1);
        assert_eq!(found.records[0].food_code, "D004");

        assert!(delete_nutrient_record(&db, "D004").unwrap());
        assert!(get_nutrient_record(&db, "D004").unwrap().is_none());
        assert!(add_nutrient_record(&db, NutrientRecordUpsert::default()).is_err());
    }

    #[test]
    fn test_unit_conversions() {
        let (db, _dir) = test_db();
        let saved = add_unit_conversion(
            &db,
            UnitConversion {
                food_code: "A001".to_string(),
                unit: " Cup ".to_string(),
                grams_per_unit: 185.0,
                density: 0.78,
            },
        )
        .unwrap();
        assert_eq!(saved.unit, "cup");

        assert_eq!(list_unit_conversions(&db, Some("A001")).unwrap().len(), 1);
        assert_eq!(list_unit_conversions(&db, None).unwrap().len(), 1);

        let bad = UnitConversion { grams_per_unit: -1.0, ..saved };
        assert!(add_unit_conversion(&db, bad).is_err());
    }
}
