use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::macros::{fmt_grams, MacroGroup};

/// A food with its composition per 100 g.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Food {
    pub id: Uuid,
    pub name: String,
    /// kcal per 100 g
    #[serde(default)]
    pub kcal: f64,
    /// carbohydrate grams per 100 g
    #[serde(rename = "c", default)]
    pub carbs: f64,
    /// protein grams per 100 g
    #[serde(rename = "p", default)]
    pub protein: f64,
    /// fat grams per 100 g
    #[serde(default)]
    pub fat: f64,
    /// Dominant macro group, fixed when the food is created or edited.
    pub group: MacroGroup,
    /// Part of the bundled reference catalog.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub bundled: bool,
}

impl Food {
    pub fn new(name: impl Into<String>, kcal: f64, carbs: f64, protein: f64, fat: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kcal,
            carbs,
            protein,
            fat,
            group: dominant_group(carbs, protein, fat),
            bundled: false,
        }
    }

    /// Grams of `group` per 100 g of this food.
    pub fn per_100(&self, group: MacroGroup) -> f64 {
        match group {
            MacroGroup::Carbs => self.carbs,
            MacroGroup::Protein => self.protein,
            MacroGroup::Fat => self.fat,
        }
    }

    /// Replaces composition and name, keeping the identity.
    pub fn apply(&mut self, name: impl Into<String>, kcal: f64, carbs: f64, protein: f64, fat: f64) {
        self.name = name.into();
        self.kcal = kcal;
        self.carbs = carbs;
        self.protein = protein;
        self.fat = fat;
        self.group = dominant_group(carbs, protein, fat);
    }

    /// kcal per 100 g estimated from the macros alone.
    pub fn estimated_kcal(&self) -> f64 {
        MacroGroup::ALL
            .iter()
            .map(|g| self.per_100(*g) * g.kcal_per_gram())
            .sum()
    }
}

impl fmt::Display for Food {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} kcal - C {} g - P {} g - F {} g (per 100 g)",
            self.name,
            self.group,
            fmt_grams(self.kcal),
            fmt_grams(self.carbs),
            fmt_grams(self.protein),
            fmt_grams(self.fat)
        )
    }
}

/// The macro group with the largest content. Ties go to the earlier group in
/// carbs > protein > fat order.
pub fn dominant_group(carbs: f64, protein: f64, fat: f64) -> MacroGroup {
    let mut best = (MacroGroup::Carbs, carbs);
    for (group, value) in [(MacroGroup::Protein, protein), (MacroGroup::Fat, fat)] {
        if value > best.1 {
            best = (group, value);
        }
    }
    best.0
}

/// Parses a user-entered amount. Anything unparseable becomes 0.
///
/// Accepts a decimal comma.
pub fn parse_amount(input: &str) -> f64 {
    let normalized = input.trim().replace(',', ".");
    match normalized.parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dominant_group() {
        assert_eq!(dominant_group(79.0, 7.0, 0.6), MacroGroup::Carbs);
        assert_eq!(dominant_group(0.0, 23.0, 2.6), MacroGroup::Protein);
        assert_eq!(dominant_group(0.0, 0.0, 100.0), MacroGroup::Fat);
    }

    #[test]
    fn test_dominant_group_ties() {
        assert_eq!(dominant_group(10.0, 10.0, 10.0), MacroGroup::Carbs);
        assert_eq!(dominant_group(5.0, 10.0, 10.0), MacroGroup::Protein);
        assert_eq!(dominant_group(0.0, 0.0, 0.0), MacroGroup::Carbs);
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("12.5"), 12.5);
        assert_eq!(parse_amount(" 7,2 "), 7.2);
        assert_eq!(parse_amount("abc"), 0.0);
        assert_eq!(parse_amount(""), 0.0);
        assert_eq!(parse_amount("NaN"), 0.0);
    }

    #[test]
    fn test_apply_keeps_identity_and_regroups() {
        let mut food = Food::new("Rice", 360.0, 79.0, 7.0, 0.6);
        let id = food.id;
        food.apply("Chicken", 120.0, 0.0, 23.0, 2.6);
        assert_eq!(food.id, id);
        assert_eq!(food.name, "Chicken");
        assert_eq!(food.group, MacroGroup::Protein);
    }

    #[test]
    fn test_food_json_keys() {
        let food = Food::new("Olive oil", 884.0, 0.0, 0.0, 100.0);
        let value = serde_json::to_value(&food).unwrap();
        assert_eq!(value["c"], 0.0);
        assert_eq!(value["fat"], 100.0);
        assert_eq!(value["group"], "f");
        assert!(value.get("bundled").is_none());
    }

    #[test]
    fn test_estimated_kcal() {
        let food = Food::new("Mix", 0.0, 10.0, 10.0, 10.0);
        assert_eq!(food.estimated_kcal(), 170.0);
    }
}
