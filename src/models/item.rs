use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::macros::MacroGroup;

/// Which way grid rounding moved an exact quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApproxDirection {
    Up,
    Down,
}

/// A quantity of one food inside a macro group of a meal or variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub food_id: Uuid,
    #[serde(rename = "g", default)]
    pub grams: f64,
    /// Quantity was computed rather than typed in.
    #[serde(default)]
    pub auto: bool,
    #[serde(default)]
    pub approx_dir: Option<ApproxDirection>,
}

impl Item {
    pub fn new(food_id: Uuid) -> Self {
        Self {
            food_id,
            grams: 0.0,
            auto: false,
            approx_dir: None,
        }
    }
}

/// Items of a meal or variant, one list per macro group.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupedItems {
    #[serde(rename = "c", default)]
    pub carbs: Vec<Item>,
    #[serde(rename = "p", default)]
    pub protein: Vec<Item>,
    #[serde(rename = "f", default)]
    pub fat: Vec<Item>,
}

impl GroupedItems {
    pub fn group(&self, group: MacroGroup) -> &Vec<Item> {
        match group {
            MacroGroup::Carbs => &self.carbs,
            MacroGroup::Protein => &self.protein,
            MacroGroup::Fat => &self.fat,
        }
    }

    pub fn group_mut(&mut self, group: MacroGroup) -> &mut Vec<Item> {
        match group {
            MacroGroup::Carbs => &mut self.carbs,
            MacroGroup::Protein => &mut self.protein,
            MacroGroup::Fat => &mut self.fat,
        }
    }

    /// Iterates `(group, item)` over every group.
    pub fn iter(&self) -> impl Iterator<Item = (MacroGroup, &Item)> {
        MacroGroup::ALL
            .into_iter()
            .flat_map(move |g| self.group(g).iter().map(move |item| (g, item)))
    }

    pub fn is_empty(&self) -> bool {
        self.carbs.is_empty() && self.protein.is_empty() && self.fat.is_empty()
    }

    /// Removes every item referencing `food_id`. Returns how many were removed.
    pub fn remove_food(&mut self, food_id: Uuid) -> usize {
        let mut removed = 0;
        for group in MacroGroup::ALL {
            let items = self.group_mut(group);
            let before = items.len();
            items.retain(|item| item.food_id != food_id);
            removed += before - items.len();
        }
        removed
    }

    /// Keeps only the items whose food satisfies `keep`.
    pub fn retain_foods(&mut self, mut keep: impl FnMut(Uuid) -> bool) -> usize {
        let mut removed = 0;
        for group in MacroGroup::ALL {
            let items = self.group_mut(group);
            let before = items.len();
            items.retain(|item| keep(item.food_id));
            removed += before - items.len();
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_json_keys() {
        let mut item = Item::new(Uuid::new_v4());
        item.grams = 80.0;
        item.auto = true;
        item.approx_dir = Some(ApproxDirection::Up);
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(value["g"], 80.0);
        assert_eq!(value["approxDir"], "up");
        assert!(value.get("foodId").is_some());
    }

    #[test]
    fn test_remove_food_across_groups() {
        let keep = Uuid::new_v4();
        let drop = Uuid::new_v4();
        let mut items = GroupedItems::default();
        items.carbs.push(Item::new(drop));
        items.carbs.push(Item::new(keep));
        items.fat.push(Item::new(drop));

        assert_eq!(items.remove_food(drop), 2);
        assert_eq!(items.carbs.len(), 1);
        assert_eq!(items.carbs[0].food_id, keep);
        assert!(items.fat.is_empty());
    }

    #[test]
    fn test_iter_visits_all_groups() {
        let mut items = GroupedItems::default();
        items.carbs.push(Item::new(Uuid::new_v4()));
        items.protein.push(Item::new(Uuid::new_v4()));
        items.fat.push(Item::new(Uuid::new_v4()));
        let groups: Vec<MacroGroup> = items.iter().map(|(g, _)| g).collect();
        assert_eq!(groups, MacroGroup::ALL.to_vec());
    }
}
