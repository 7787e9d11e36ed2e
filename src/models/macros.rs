use serde::{Deserialize, Serialize};
use std::fmt;

/// kcal per gram of carbohydrate.
pub const KCAL_PER_G_CARBS: f64 = 4.0;
/// kcal per gram of protein.
pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
/// kcal per gram of fat.
pub const KCAL_PER_G_FAT: f64 = 9.0;

/// One of the three macro-nutrient groups.
///
/// Serialized with the single-letter keys used by the stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MacroGroup {
    #[serde(rename = "c")]
    Carbs,
    #[serde(rename = "p")]
    Protein,
    #[serde(rename = "f")]
    Fat,
}

impl MacroGroup {
    /// All groups in priority order (carbs > protein > fat).
    pub const ALL: [MacroGroup; 3] = [MacroGroup::Carbs, MacroGroup::Protein, MacroGroup::Fat];

    pub fn kcal_per_gram(self) -> f64 {
        match self {
            MacroGroup::Carbs => KCAL_PER_G_CARBS,
            MacroGroup::Protein => KCAL_PER_G_PROTEIN,
            MacroGroup::Fat => KCAL_PER_G_FAT,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MacroGroup::Carbs => "carbs",
            MacroGroup::Protein => "protein",
            MacroGroup::Fat => "fat",
        }
    }

    /// Parse from a name or its single-letter key (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "c" | "carb" | "carbs" | "carbohydrate" | "carbohydrates" => Some(MacroGroup::Carbs),
            "p" | "prot" | "protein" | "proteins" => Some(MacroGroup::Protein),
            "f" | "fat" | "fats" => Some(MacroGroup::Fat),
            _ => None,
        }
    }
}

impl fmt::Display for MacroGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Grams of each macro group.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Macros {
    #[serde(rename = "c", default)]
    pub carbs: f64,
    #[serde(rename = "p", default)]
    pub protein: f64,
    #[serde(rename = "f", default)]
    pub fat: f64,
}

impl Macros {
    pub fn new(carbs: f64, protein: f64, fat: f64) -> Self {
        Self {
            carbs,
            protein,
            fat,
        }
    }

    pub fn get(&self, group: MacroGroup) -> f64 {
        match group {
            MacroGroup::Carbs => self.carbs,
            MacroGroup::Protein => self.protein,
            MacroGroup::Fat => self.fat,
        }
    }

    pub fn set(&mut self, group: MacroGroup, grams: f64) {
        match group {
            MacroGroup::Carbs => self.carbs = grams,
            MacroGroup::Protein => self.protein = grams,
            MacroGroup::Fat => self.fat = grams,
        }
    }

    /// Energy implied by the gram amounts.
    pub fn kcal(&self) -> f64 {
        self.carbs * KCAL_PER_G_CARBS + self.protein * KCAL_PER_G_PROTEIN + self.fat * KCAL_PER_G_FAT
    }
}

impl fmt::Display for Macros {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "C {} g - P {} g - F {} g",
            fmt_grams(self.carbs),
            fmt_grams(self.protein),
            fmt_grams(self.fat)
        )
    }
}

/// A meal's macro target snapshot. `kcal` is always derived from the grams.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MealTarget {
    #[serde(flatten)]
    pub grams: Macros,
    #[serde(default)]
    pub kcal: f64,
}

impl MealTarget {
    pub fn from_grams(grams: Macros) -> Self {
        Self {
            grams,
            kcal: grams.kcal(),
        }
    }
}

/// Formats a gram or kcal amount with at most one decimal.
pub fn fmt_grams(value: f64) -> String {
    let rounded = (value * 10.0).round() / 10.0;
    if rounded.fract() == 0.0 {
        format!("{:.0}", rounded)
    } else {
        format!("{:.1}", rounded)
    }
}
