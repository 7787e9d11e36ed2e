//! Meals and their variants.
//!
//! A meal's live `items` always mirror its active variant. Every method that
//! touches either side restores that before returning.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::item::GroupedItems;
use super::macros::MealTarget;

/// A named alternative composition for a meal slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub items: GroupedItems,
}

impl Variant {
    pub fn new(name: impl Into<String>, items: GroupedItems) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            items,
        }
    }
}

/// Returned when a variant operation cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariantOpError {
    /// The only variant of a meal cannot be deleted.
    LastVariant,
    /// No variant with that id.
    NotFound(Uuid),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Meal {
    pub name: String,
    #[serde(default)]
    pub macros: MealTarget,
    #[serde(default)]
    pub items: GroupedItems,
    #[serde(default)]
    pub variants: Vec<Variant>,
    #[serde(default)]
    pub active_var_id: Option<Uuid>,
}

impl Meal {
    /// A new meal with a single empty variant.
    pub fn new(name: impl Into<String>) -> Self {
        let mut meal = Self {
            name: name.into(),
            macros: MealTarget::default(),
            items: GroupedItems::default(),
            variants: Vec::new(),
            active_var_id: None,
        };
        meal.ensure_variant();
        meal
    }

    /// Guarantees at least one variant and a valid active id.
    ///
    /// A meal without variants gets "Type 1" cloned from its live items.
    pub fn ensure_variant(&mut self) {
        if self.variants.is_empty() {
            let variant = Variant::new("Type 1", self.items.clone());
            self.active_var_id = Some(variant.id);
            self.variants.push(variant);
            return;
        }
        let valid = self
            .active_var_id
            .map(|id| self.variants.iter().any(|v| v.id == id))
            .unwrap_or(false);
        if !valid {
            self.active_var_id = Some(self.variants[0].id);
        }
    }

    fn active_index(&self) -> usize {
        self.active_var_id
            .and_then(|id| self.variants.iter().position(|v| v.id == id))
            .unwrap_or(0)
    }

    pub fn active_variant(&self) -> Option<&Variant> {
        self.variants.get(self.active_index())
    }

    /// Copies the live items into the active variant.
    pub fn sync_active_variant(&mut self) {
        self.ensure_variant();
        let idx = self.active_index();
        self.variants[idx].items = self.items.clone();
    }

    /// Makes `variant_id` active and loads its items into the meal.
    pub fn switch_variant(&mut self, variant_id: Uuid) -> Result<(), VariantOpError> {
        let variant = self
            .variants
            .iter()
            .find(|v| v.id == variant_id)
            .ok_or(VariantOpError::NotFound(variant_id))?;
        self.items = variant.items.clone();
        self.active_var_id = Some(variant_id);
        Ok(())
    }

    /// Clones the live items into a new "Type N" variant and activates it.
    pub fn new_variant_from_current(&mut self) -> Uuid {
        self.ensure_variant();
        let name = format!("Type {}", self.variants.len() + 1);
        let variant = Variant::new(name, self.items.clone());
        let id = variant.id;
        self.variants.push(variant);
        self.active_var_id = Some(id);
        id
    }

    pub fn rename_active_variant(&mut self, name: impl Into<String>) {
        self.ensure_variant();
        let idx = self.active_index();
        self.variants[idx].name = name.into();
    }

    /// Deletes the active variant, activating the first remaining one.
    pub fn delete_active_variant(&mut self) -> Result<(), VariantOpError> {
        if self.variants.len() <= 1 {
            return Err(VariantOpError::LastVariant);
        }
        let idx = self.active_index();
        self.variants.remove(idx);
        let first = &self.variants[0];
        self.active_var_id = Some(first.id);
        self.items = first.items.clone();
        Ok(())
    }

    /// Finds a variant by id or case-insensitive name.
    pub fn find_variant(&self, key: &str) -> Option<&Variant> {
        if let Ok(id) = Uuid::parse_str(key) {
            if let Some(v) = self.variants.iter().find(|v| v.id == id) {
                return Some(v);
            }
        }
        let key = key.to_lowercase();
        self.variants.iter().find(|v| v.name.to_lowercase() == key)
    }

    /// True when live items equal the active variant's stored items.
    pub fn is_consistent(&self) -> bool {
        match self.active_variant() {
            Some(v) => self.active_var_id == Some(v.id) && v.items == self.items,
            None => false,
        }
    }
}
