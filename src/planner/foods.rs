//! Food CRUD, search and bulk import.

use std::path::Path;

use serde_json::Value;
use uuid::Uuid;

use crate::models::{parse_amount, Document, Food};

use super::error::{ImportError, PlanError, PlanResult};
use super::rounding::finite_amount;

/// User-entered food fields. Amounts are per 100 g.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FoodInput {
    pub name: String,
    pub kcal: f64,
    pub carbs: f64,
    pub protein: f64,
    pub fat: f64,
}

impl FoodInput {
    pub fn new(name: impl Into<String>, kcal: f64, carbs: f64, protein: f64, fat: f64) -> Self {
        Self {
            name: name.into(),
            kcal,
            carbs,
            protein,
            fat,
        }
    }

    /// Builds an input from raw text fields. Unparseable amounts become 0.
    pub fn parse(name: &str, kcal: &str, carbs: &str, protein: &str, fat: &str) -> Self {
        Self::new(
            name.trim(),
            parse_amount(kcal),
            parse_amount(carbs),
            parse_amount(protein),
            parse_amount(fat),
        )
    }

    fn validated_name(&self) -> PlanResult<String> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(PlanError::EmptyName);
        }
        for amount in [self.kcal, self.carbs, self.protein, self.fat] {
            finite_amount(amount)?;
        }
        Ok(name.to_string())
    }
}

fn food_index(doc: &Document, key: &str) -> PlanResult<usize> {
    let id = doc
        .find_food(key)
        .map(|f| f.id)
        .ok_or_else(|| PlanError::FoodNotFound(key.to_string()))?;
    doc.foods
        .iter()
        .position(|f| f.id == id)
        .ok_or_else(|| PlanError::FoodNotFound(key.to_string()))
}

pub fn create_food(doc: &mut Document, input: &FoodInput) -> PlanResult<Uuid> {
    let name = input.validated_name()?;
    let food = Food::new(name, input.kcal, input.carbs, input.protein, input.fat);
    let id = food.id;
    doc.foods.push(food);
    Ok(id)
}

/// Replaces a food's fields in place. The id is preserved.
pub fn edit_food(doc: &mut Document, key: &str, input: &FoodInput) -> PlanResult<()> {
    let name = input.validated_name()?;
    let index = food_index(doc, key)?;
    let food = &mut doc.foods[index];
    food.apply(name, input.kcal, input.carbs, input.protein, input.fat);
    food.bundled = false;
    Ok(())
}

/// Removes a food and every item referencing it.
///
/// Items are dropped from live meal items and from every stored variant of
/// every profile, then each meal is resynced with its active variant.
pub fn delete_food(doc: &mut Document, key: &str) -> PlanResult<Food> {
    let index = food_index(doc, key)?;
    let food = doc.foods.remove(index);
    for profile in &mut doc.profiles {
        for meal in &mut profile.meals {
            meal.items.remove_food(food.id);
            for variant in &mut meal.variants {
                variant.items.remove_food(food.id);
            }
            meal.sync_active_variant();
        }
    }
    Ok(food)
}

/// Foods whose name contains `query` (case-insensitive), sorted by name.
pub fn search_foods<'a>(doc: &'a Document, query: &str) -> Vec<&'a Food> {
    let query = query.trim().to_lowercase();
    let mut foods: Vec<&Food> = doc
        .foods
        .iter()
        .filter(|f| query.is_empty() || f.name.to_lowercase().contains(&query))
        .collect();
    foods.sort_by_key(|f| f.name.to_lowercase());
    foods
}

/// Outcome of a bulk food import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportSummary {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

/// Upserts foods by case-insensitive name. Rows without a name are skipped.
pub fn import_foods(doc: &mut Document, inputs: &[FoodInput]) -> ImportSummary {
    let mut summary = ImportSummary::default();
    for input in inputs {
        let Ok(name) = input.validated_name() else {
            summary.skipped += 1;
            continue;
        };
        let lower = name.to_lowercase();
        match doc.foods.iter_mut().find(|f| f.name.to_lowercase() == lower) {
            Some(existing) => {
                existing.apply(name, input.kcal, input.carbs, input.protein, input.fat);
                existing.bundled = false;
                summary.updated += 1;
            }
            None => {
                doc.foods
                    .push(Food::new(name, input.kcal, input.carbs, input.protein, input.fat));
                summary.created += 1;
            }
        }
    }
    summary
}

/// Source format of a foods file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FoodFormat {
    Json,
    Csv,
}

impl FoodFormat {
    /// Picks the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ImportError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        match ext.as_str() {
            "json" => Ok(FoodFormat::Json),
            "csv" | "txt" => Ok(FoodFormat::Csv),
            other => Err(ImportError::UnsupportedFormat(other.to_string())),
        }
    }
}

pub fn parse_foods(format: FoodFormat, text: &str) -> Result<Vec<FoodInput>, ImportError> {
    match format {
        FoodFormat::Json => parse_foods_json(text),
        FoodFormat::Csv => parse_foods_csv(text),
    }
}

fn amount(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Some(Value::String(s)) => parse_amount(s),
        _ => 0.0,
    }
}

/// Parses a JSON array of `{name, kcal, c, p, fat}` objects.
///
/// Amounts may be numbers or numeric strings. Entries that are not objects
/// come back with an empty name and are skipped on import.
pub fn parse_foods_json(text: &str) -> Result<Vec<FoodInput>, ImportError> {
    let value: Value = serde_json::from_str(text)?;
    let Value::Array(entries) = value else {
        return Err(ImportError::NotAnArray);
    };
    Ok(entries
        .iter()
        .map(|entry| FoodInput {
            name: entry
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string(),
            kcal: amount(entry.get("kcal")),
            carbs: amount(entry.get("c")),
            protein: amount(entry.get("p")),
            fat: amount(entry.get("fat")),
        })
        .collect())
}

/// Parses `;`-separated CSV with a header row.
///
/// Recognized headers (case-insensitive): `name`/`nome`, `kcal`,
/// `carbs`/`carbo`/`carboidrati`, `protein`/`proteine`, `fat`/`grassi`.
/// The name defaults to the first column; missing amounts are 0.
pub fn parse_foods_csv(text: &str) -> Result<Vec<FoodInput>, ImportError> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers = rdr.headers()?.clone();
    let col = |names: &[&str]| -> Option<usize> {
        headers
            .iter()
            .position(|h| names.iter().any(|n| h.eq_ignore_ascii_case(n)))
    };
    let idx_name = col(&["name", "nome"]).unwrap_or(0);
    let idx_kcal = col(&["kcal"]);
    let idx_carbs = col(&["carbs", "carbo", "carboidrati"]);
    let idx_protein = col(&["protein", "proteine"]);
    let idx_fat = col(&["fat", "grassi"]);

    let mut foods = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|field| field.is_empty()) {
            continue;
        }
        let field = |idx: Option<usize>| -> f64 {
            idx.and_then(|i| record.get(i))
                .map(parse_amount)
                .unwrap_or(0.0)
        };
        foods.push(FoodInput {
            name: record.get(idx_name).unwrap_or_default().to_string(),
            kcal: field(idx_kcal),
            carbs: field(idx_carbs),
            protein: field(idx_protein),
            fat: field(idx_fat),
        });
    }
    Ok(foods)
}
