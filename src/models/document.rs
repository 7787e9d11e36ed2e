//! The synchronized whole-state document.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::food::Food;
use super::profile::Profile;

/// Schema version stamped on every save.
pub const SCHEMA_VERSION: u32 = 2;

/// Logical clock and schema marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meta {
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
}

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for Meta {
    fn default() -> Self {
        Self {
            updated_at: 0,
            schema_version: SCHEMA_VERSION,
        }
    }
}

fn yes() -> bool {
    true
}

/// Per-group boolean flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupFlags {
    #[serde(default)]
    pub c: bool,
    #[serde(default)]
    pub p: bool,
    #[serde(default)]
    pub f: bool,
}

/// Which columns the printable plan shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewPrefs {
    #[serde(rename = "showC", default = "yes")]
    pub show_carbs: bool,
    #[serde(rename = "showP", default = "yes")]
    pub show_protein: bool,
    #[serde(rename = "showF", default = "yes")]
    pub show_fat: bool,
    #[serde(default = "yes")]
    pub show_targets: bool,
}

impl Default for PreviewPrefs {
    fn default() -> Self {
        Self {
            show_carbs: true,
            show_protein: true,
            show_fat: true,
            show_targets: true,
        }
    }
}

/// UI preferences carried in the document. Missing keys load as defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UiPrefs {
    #[serde(default = "yes")]
    pub show_hints: bool,
    #[serde(default)]
    pub foods_collapsed: GroupFlags,
    /// Snap hand-entered grams to the 5 g grid.
    #[serde(rename = "snapManual5", default)]
    pub snap_manual: bool,
    #[serde(default)]
    pub preview: PreviewPrefs,
}

impl Default for UiPrefs {
    fn default() -> Self {
        Self {
            show_hints: true,
            foods_collapsed: GroupFlags::default(),
            snap_manual: false,
            preview: PreviewPrefs::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    #[serde(rename = "_meta", default)]
    pub meta: Meta,
    #[serde(default)]
    pub foods: Vec<Food>,
    #[serde(default)]
    pub foods_version: Option<String>,
    #[serde(default)]
    pub profiles: Vec<Profile>,
    pub current_profile_id: Uuid,
    #[serde(default)]
    pub ui: UiPrefs,
}

impl Document {
    /// A fresh document with one default profile and `updatedAt = 0`.
    pub fn seed() -> Self {
        let profile = Profile::new("Profile 1");
        Self {
            meta: Meta::default(),
            foods: Vec::new(),
            foods_version: None,
            current_profile_id: profile.id,
            profiles: vec![profile],
            ui: UiPrefs::default(),
        }
    }

    pub fn updated_at(&self) -> i64 {
        self.meta.updated_at
    }

    /// Advances the logical clock. Strictly increasing even if the wall
    /// clock stalls or steps back.
    pub fn stamp(&mut self) {
        let now = Utc::now().timestamp_millis();
        self.meta.updated_at = now.max(self.meta.updated_at + 1);
        self.meta.schema_version = SCHEMA_VERSION;
    }

    pub fn current_profile(&self) -> Option<&Profile> {
        self.profiles
            .iter()
            .find(|p| p.id == self.current_profile_id)
    }

    pub fn current_profile_mut(&mut self) -> Option<&mut Profile> {
        let id = self.current_profile_id;
        self.profiles.iter_mut().find(|p| p.id == id)
    }

    pub fn food(&self, id: Uuid) -> Option<&Food> {
        self.foods.iter().find(|f| f.id == id)
    }

    /// Finds a food by id or case-insensitive exact name.
    pub fn find_food(&self, key: &str) -> Option<&Food> {
        if let Ok(id) = Uuid::parse_str(key.trim()) {
            if let Some(food) = self.food(id) {
                return Some(food);
            }
        }
        let key = key.trim().to_lowercase();
        self.foods.iter().find(|f| f.name.to_lowercase() == key)
    }

    /// Silent integrity repairs applied after loading or adopting a document.
    ///
    /// Does not touch the logical clock.
    pub fn repair(&mut self) {
        if self.profiles.is_empty() {
            let profile = Profile::new("Profile 1");
            self.current_profile_id = profile.id;
            self.profiles.push(profile);
        }
        if self.current_profile().is_none() {
            self.current_profile_id = self.profiles[0].id;
        }
        for profile in &mut self.profiles {
            profile.ensure_meals();
            profile.ensure_percentages();
            for meal in &mut profile.meals {
                meal.sync_active_variant();
            }
        }
    }

    /// Drops items (live and in every variant) whose food no longer exists.
    pub fn prune_dangling_items(&mut self) -> usize {
        let known: std::collections::HashSet<Uuid> = self.foods.iter().map(|f| f.id).collect();
        let mut removed = 0;
        for profile in &mut self.profiles {
            for meal in &mut profile.meals {
                removed += meal.items.retain_foods(|id| known.contains(&id));
                for variant in &mut meal.variants {
                    removed += variant.items.retain_foods(|id| known.contains(&id));
                }
            }
        }
        removed
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::seed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::item::Item;

    #[test]
    fn test_seed_document() {
        let doc = Document::seed();
        assert_eq!(doc.updated_at(), 0);
        assert_eq!(doc.meta.schema_version, SCHEMA_VERSION);
        assert_eq!(doc.profiles.len(), 1);
        assert_eq!(doc.current_profile().unwrap().name, "Profile 1");
        assert!(doc.ui.show_hints);
    }

    #[test]
    fn test_stamp_is_strictly_increasing() {
        let mut doc = Document::seed();
        doc.meta.updated_at = i64::MAX / 2;
        let before = doc.updated_at();
        doc.stamp();
        assert_eq!(doc.updated_at(), before + 1);
        doc.stamp();
        assert_eq!(doc.updated_at(), before + 2);
    }

    #[test]
    fn test_meta_json_key() {
        let mut doc = Document::seed();
        doc.meta.updated_at = 100;
        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["_meta"]["updatedAt"], 100);
        assert_eq!(value["_meta"]["schemaVersion"], 2);
        assert!(value["currentProfileId"].is_string());
        assert_eq!(value["ui"]["snapManual5"], false);
    }

    #[test]
    fn test_missing_ui_backfilled_on_load() {
        let doc = Document::seed();
        let mut value = serde_json::to_value(&doc).unwrap();
        value["ui"] = serde_json::json!({ "showHints": false });

        let loaded: Document = serde_json::from_value(value).unwrap();
        assert!(!loaded.ui.show_hints);
        assert!(loaded.ui.preview.show_targets);
        assert!(!loaded.ui.foods_collapsed.c);
    }

    #[test]
    fn test_repair_restores_current_profile_and_meals() {
        let mut doc = Document::seed();
        doc.current_profile_id = Uuid::new_v4();
        doc.profiles[0].meals.clear();
        doc.repair();
        assert!(doc.current_profile().is_some());
        assert_eq!(doc.profiles[0].meals.len(), 3);
    }

    #[test]
    fn test_repair_clamps_stored_percentages() {
        let mut doc = Document::seed();
        let mut value = serde_json::to_value(&doc).unwrap();
        value["profiles"][0]["percentages"][0]["c"] = 4_294_967_246_u32.into();
        value["profiles"][0]["percentages"][1]["c"] = 150.into();
        doc = serde_json::from_value(value).unwrap();
        assert_eq!(doc.profiles[0].percentages[0].carbs, 4_294_967_246);

        doc.repair();
        let rows = &doc.profiles[0].percentages;
        assert_eq!(rows[0].carbs, 100);
        assert_eq!(rows[1].carbs, 100);
        assert!(rows.iter().all(|r| r.protein <= 100 && r.fat <= 100));
    }

    #[test]
    fn test_repair_creates_profile_when_missing() {
        let mut doc = Document::seed();
        doc.profiles.clear();
        doc.repair();
        assert_eq!(doc.profiles.len(), 1);
        assert_eq!(doc.current_profile_id, doc.profiles[0].id);
    }

    #[test]
    fn test_prune_dangling_items() {
        let mut doc = Document::seed();
        let food = crate::models::Food::new("Rice", 360.0, 79.0, 7.0, 0.6);
        let food_id = food.id;
        doc.foods.push(food);
        let meal = &mut doc.profiles[0].meals[0];
        meal.items.carbs.push(Item::new(food_id));
        meal.items.carbs.push(Item::new(Uuid::new_v4()));
        meal.sync_active_variant();

        assert_eq!(doc.prune_dangling_items(), 2);
        let meal = &doc.profiles[0].meals[0];
        assert_eq!(meal.items.carbs.len(), 1);
        assert!(meal.is_consistent());
    }
}
