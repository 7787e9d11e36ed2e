//! Backup bundles, food dumps and the printable plan sheet.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{
    fmt_grams, parse_amount, Document, Food, GroupedItems, MacroGroup, Profile, UiPrefs,
};
use crate::planner::{ImportError, ImportSummary};

/// Structured dump of everything but the sync metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bundle {
    pub profiles: Vec<Profile>,
    pub current_profile_id: Uuid,
    pub foods: Vec<Food>,
    pub ui: UiPrefs,
}

impl Bundle {
    pub fn from_document(doc: &Document) -> Self {
        Self {
            profiles: doc.profiles.clone(),
            current_profile_id: doc.current_profile_id,
            foods: doc.foods.clone(),
            ui: doc.ui,
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Flat JSON array of every food.
pub fn foods_json(doc: &Document) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&doc.foods)
}

/// What a bundle import changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BundleImport {
    pub profiles: usize,
    pub foods: ImportSummary,
    pub dropped_items: usize,
}

enum Incoming {
    Replace {
        profiles: Vec<Profile>,
        current: Option<Uuid>,
    },
    Append(Box<Profile>),
}

struct IncomingFood {
    id: Option<Uuid>,
    name: String,
    kcal: f64,
    carbs: f64,
    protein: f64,
    fat: f64,
}

fn number(value: Option<&Value>) -> f64 {
    match value {
        Some(Value::Number(n)) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Some(Value::String(s)) => parse_amount(s),
        _ => 0.0,
    }
}

fn incoming_foods(value: Option<&Value>) -> Vec<IncomingFood> {
    let Some(Value::Array(entries)) = value else {
        return Vec::new();
    };
    entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?.trim();
            if name.is_empty() {
                return None;
            }
            Some(IncomingFood {
                id: entry
                    .get("id")
                    .and_then(Value::as_str)
                    .and_then(|s| Uuid::parse_str(s).ok()),
                name: name.to_string(),
                kcal: number(entry.get("kcal")),
                carbs: number(entry.get("c")),
                protein: number(entry.get("p")),
                fat: number(entry.get("fat")),
            })
        })
        .collect()
}

/// Imports a full bundle (`profiles`) or a single exported profile (`profile`).
///
/// The payload is fully parsed before anything is applied. Foods are upserted
/// by case-insensitive name, item references are remapped to the resolved
/// local foods and unresolved items are dropped.
pub fn import_bundle(doc: &mut Document, text: &str) -> Result<BundleImport, ImportError> {
    let value: Value = serde_json::from_str(text)?;

    let incoming = if let Some(profiles) = value.get("profiles") {
        let profiles: Vec<Profile> = serde_json::from_value(profiles.clone())?;
        if profiles.is_empty() {
            return Err(ImportError::EmptyBundle);
        }
        let current = value
            .get("currentProfileId")
            .and_then(Value::as_str)
            .and_then(|s| Uuid::parse_str(s).ok());
        Incoming::Replace { profiles, current }
    } else if let Some(profile) = value.get("profile") {
        let profile: Profile = serde_json::from_value(profile.clone())?;
        Incoming::Append(Box::new(profile))
    } else {
        return Err(ImportError::UnknownBundle);
    };
    let ui: Option<UiPrefs> = match value.get("ui") {
        Some(ui) => Some(serde_json::from_value(ui.clone())?),
        None => None,
    };
    let foods = incoming_foods(value.get("foods"));

    let mut result = BundleImport::default();
    let mut remap: HashMap<Uuid, Uuid> = doc.foods.iter().map(|f| (f.id, f.id)).collect();
    for food in foods {
        let lower = food.name.to_lowercase();
        let resolved = match doc.foods.iter_mut().find(|f| f.name.to_lowercase() == lower) {
            Some(existing) => {
                existing.apply(food.name, food.kcal, food.carbs, food.protein, food.fat);
                existing.bundled = false;
                result.foods.updated += 1;
                existing.id
            }
            None => {
                let mut created =
                    Food::new(food.name, food.kcal, food.carbs, food.protein, food.fat);
                if let Some(id) = food.id.filter(|id| !remap.contains_key(id)) {
                    created.id = id;
                }
                let id = created.id;
                doc.foods.push(created);
                result.foods.created += 1;
                id
            }
        };
        remap.insert(resolved, resolved);
        if let Some(old) = food.id {
            remap.insert(old, resolved);
        }
    }

    let mut remap_profile = |profile: &mut Profile| {
        for meal in &mut profile.meals {
            result.dropped_items += remap_items(&mut meal.items, &remap);
            for variant in &mut meal.variants {
                remap_items(&mut variant.items, &remap);
            }
        }
    };

    match incoming {
        Incoming::Replace {
            mut profiles,
            current,
        } => {
            profiles.iter_mut().for_each(&mut remap_profile);
            result.profiles = profiles.len();
            doc.current_profile_id = current
                .filter(|id| profiles.iter().any(|p| p.id == *id))
                .unwrap_or(profiles[0].id);
            doc.profiles = profiles;
        }
        Incoming::Append(mut profile) => {
            remap_profile(&mut *profile);
            profile.id = Uuid::new_v4();
            doc.current_profile_id = profile.id;
            doc.profiles.push(*profile);
            result.profiles = 1;
        }
    }
    if let Some(ui) = ui {
        doc.ui = ui;
    }
    doc.repair();
    Ok(result)
}

fn remap_items(items: &mut GroupedItems, remap: &HashMap<Uuid, Uuid>) -> usize {
    let mut dropped = 0;
    for group in MacroGroup::ALL {
        items.group_mut(group).retain_mut(|item| match remap.get(&item.food_id) {
            Some(id) => {
                item.food_id = *id;
                true
            }
            None => {
                dropped += 1;
                false
            }
        });
    }
    dropped
}

/// Text rendering of the current profile's meals and every variant.
///
/// Honors the preview preferences of the document.
pub struct PlanSheet<'a> {
    doc: &'a Document,
}

pub fn plan_sheet(doc: &Document) -> PlanSheet<'_> {
    PlanSheet { doc }
}

impl fmt::Display for PlanSheet<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(profile) = self.doc.current_profile() else {
            return write!(f, "No profile selected.");
        };
        let prefs = self.doc.ui.preview;
        let columns: Vec<MacroGroup> = MacroGroup::ALL
            .into_iter()
            .filter(|g| match g {
                MacroGroup::Carbs => prefs.show_carbs,
                MacroGroup::Protein => prefs.show_protein,
                MacroGroup::Fat => prefs.show_fat,
            })
            .collect();

        writeln!(f, "{}", profile.name)?;
        if profile.meals.is_empty() {
            return write!(f, "No meals defined.");
        }
        for (i, meal) in profile.meals.iter().enumerate() {
            writeln!(f)?;
            if prefs.show_targets {
                writeln!(f, "{}. {}  [{}]", i + 1, meal.name, meal.macros.grams)?;
            } else {
                writeln!(f, "{}. {}", i + 1, meal.name)?;
            }
            for variant in &meal.variants {
                let active = if meal.active_var_id == Some(variant.id) {
                    " *"
                } else {
                    ""
                };
                writeln!(f, "   {}{}", variant.name, active)?;
                for group in &columns {
                    let rows: Vec<String> = variant
                        .items
                        .group(*group)
                        .iter()
                        .filter_map(|item| {
                            self.doc
                                .food(item.food_id)
                                .map(|food| format!("{} {} g", food.name, fmt_grams(item.grams)))
                        })
                        .collect();
                    let rows = if rows.is_empty() {
                        "-".to_string()
                    } else {
                        rows.join(", ")
                    };
                    writeln!(f, "     {:<8} {}", group.label(), rows)?;
                }
            }
        }
        Ok(())
    }
}
