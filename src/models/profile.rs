use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::macros::{MacroGroup, Macros};
use super::meal::Meal;

/// Dietary intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Bulk,
    Cut,
}

impl Phase {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "bulk" => Some(Phase::Bulk),
            "cut" => Some(Phase::Cut),
            _ => None,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Bulk => write!(f, "bulk"),
            Phase::Cut => write!(f, "cut"),
        }
    }
}

/// How daily macro targets are obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MacroMode {
    /// Derived from weight, kcal and the phase factors.
    #[default]
    Auto,
    /// Entered directly.
    Manual,
}

impl fmt::Display for MacroMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MacroMode::Auto => write!(f, "auto"),
            MacroMode::Manual => write!(f, "manual"),
        }
    }
}

/// How daily targets are split across meals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    #[default]
    Percent,
    Manual,
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SplitMode::Percent => write!(f, "percent"),
            SplitMode::Manual => write!(f, "manual"),
        }
    }
}

/// Protein and fat grams per kg of body weight for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhaseFactors {
    #[serde(rename = "p", default)]
    pub protein: f64,
    #[serde(rename = "f", default)]
    pub fat: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Factors {
    pub bulk: PhaseFactors,
    pub cut: PhaseFactors,
}

impl Factors {
    pub fn for_phase(&self, phase: Phase) -> PhaseFactors {
        match phase {
            Phase::Bulk => self.bulk,
            Phase::Cut => self.cut,
        }
    }

    pub fn for_phase_mut(&mut self, phase: Phase) -> &mut PhaseFactors {
        match phase {
            Phase::Bulk => &mut self.bulk,
            Phase::Cut => &mut self.cut,
        }
    }
}

impl Default for Factors {
    fn default() -> Self {
        Self {
            bulk: PhaseFactors {
                protein: 1.6,
                fat: 1.0,
            },
            cut: PhaseFactors {
                protein: 2.2,
                fat: 0.8,
            },
        }
    }
}

/// Per-meal percentage of each daily macro target (0-100 each).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PercentageRow {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "c", default)]
    pub carbs: u32,
    #[serde(rename = "p", default)]
    pub protein: u32,
    #[serde(rename = "f", default)]
    pub fat: u32,
}

impl PercentageRow {
    pub fn uniform(name: impl Into<String>, percent: u32) -> Self {
        Self {
            name: name.into(),
            carbs: percent,
            protein: percent,
            fat: percent,
        }
    }

    pub fn get(&self, group: MacroGroup) -> u32 {
        match group {
            MacroGroup::Carbs => self.carbs,
            MacroGroup::Protein => self.protein,
            MacroGroup::Fat => self.fat,
        }
    }

    pub fn set(&mut self, group: MacroGroup, percent: u32) {
        let percent = percent.min(100);
        match group {
            MacroGroup::Carbs => self.carbs = percent,
            MacroGroup::Protein => self.protein = percent,
            MacroGroup::Fat => self.fat = percent,
        }
    }

    /// Brings every column back into 0-100.
    pub fn clamp(&mut self) {
        for group in MacroGroup::ALL {
            self.set(group, self.get(group));
        }
    }
}

/// One user's plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub phase: Phase,
    #[serde(default)]
    pub weight: f64,
    #[serde(default)]
    pub kcal_target: f64,
    #[serde(default)]
    pub macro_mode: MacroMode,
    /// Daily macro targets in grams.
    #[serde(default)]
    pub macros: Macros,
    #[serde(default = "default_meals_count")]
    pub meals_count: usize,
    #[serde(default)]
    pub split_mode: SplitMode,
    #[serde(default)]
    pub percentages: Vec<PercentageRow>,
    #[serde(default)]
    pub meals: Vec<Meal>,
    #[serde(default)]
    pub factors: Factors,
}

fn default_meals_count() -> usize {
    3
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        let mut profile = Self {
            id: Uuid::new_v4(),
            name: name.into(),
            phase: Phase::Bulk,
            weight: 70.0,
            kcal_target: 2400.0,
            macro_mode: MacroMode::Auto,
            macros: Macros::default(),
            meals_count: default_meals_count(),
            split_mode: SplitMode::Percent,
            percentages: Vec::new(),
            meals: Vec::new(),
            factors: Factors::default(),
        };
        profile.ensure_meals();
        profile.ensure_percentages();
        profile
    }

    /// Pads or truncates meals to `meals_count` and repairs their variants.
    pub fn ensure_meals(&mut self) {
        if self.meals_count == 0 {
            self.meals_count = 1;
        }
        while self.meals.len() < self.meals_count {
            let name = format!("Meal {}", self.meals.len() + 1);
            self.meals.push(Meal::new(name));
        }
        self.meals.truncate(self.meals_count);
        for meal in &mut self.meals {
            meal.ensure_variant();
        }
    }

    /// Pads or truncates the percentage rows to `meals_count`.
    ///
    /// New rows get `round(100 / n)` in every column.
    pub fn ensure_percentages(&mut self) {
        let n = self.meals_count.max(1);
        let share = (100.0 / n as f64).round() as u32;
        while self.percentages.len() < n {
            let name = format!("Meal {}", self.percentages.len() + 1);
            self.percentages.push(PercentageRow::uniform(name, share));
        }
        self.percentages.truncate(n);
        for row in &mut self.percentages {
            row.clamp();
        }
    }

    pub fn meal(&self, index: usize) -> Option<&Meal> {
        self.meals.get(index)
    }

    pub fn meal_mut(&mut self, index: usize) -> Option<&mut Meal> {
        self.meals.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_profile_defaults() {
        let profile = Profile::new("Profile 1");
        assert_eq!(profile.phase, Phase::Bulk);
        assert_eq!(profile.meals.len(), 3);
        assert_eq!(profile.percentages.len(), 3);
        assert_eq!(profile.factors.bulk.protein, 1.6);
        assert_eq!(profile.factors.cut.fat, 0.8);
    }

    #[test]
    fn test_ensure_meals_pads_and_truncates() {
        let mut profile = Profile::new("P");
        profile.meals_count = 5;
        profile.ensure_meals();
        assert_eq!(profile.meals.len(), 5);
        assert_eq!(profile.meals[4].name, "Meal 5");

        profile.meals_count = 2;
        profile.ensure_meals();
        assert_eq!(profile.meals.len(), 2);
    }

    #[test]
    fn test_ensure_percentages_keeps_existing_rows() {
        let mut profile = Profile::new("P");
        profile.percentages[0].carbs = 50;
        profile.meals_count = 4;
        profile.ensure_percentages();
        assert_eq!(profile.percentages.len(), 4);
        assert_eq!(profile.percentages[0].carbs, 50);
        assert_eq!(profile.percentages[3].carbs, 25);
    }

    #[test]
    fn test_percentage_set_clamps() {
        let mut row = PercentageRow::uniform("Meal 1", 0);
        row.set(MacroGroup::Fat, 140);
        assert_eq!(row.fat, 100);
    }

    #[test]
    fn test_profile_json_keys() {
        let profile = Profile::new("P");
        let value = serde_json::to_value(&profile).unwrap();
        assert_eq!(value["kcalTarget"], 2400.0);
        assert_eq!(value["macroMode"], "auto");
        assert_eq!(value["splitMode"], "percent");
        assert_eq!(value["mealsCount"], 3);
        assert_eq!(value["factors"]["bulk"]["p"], 1.6);
    }

    #[test]
    fn test_phase_parse() {
        assert_eq!(Phase::parse("CUT"), Some(Phase::Cut));
        assert_eq!(Phase::parse("maintain"), None);
    }
}
