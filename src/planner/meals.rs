//! Meal, item and variant operations on the current profile.
//!
//! Meals are addressed by their 0-based position. Every item edit ends with a
//! sync-back into the active variant.

use uuid::Uuid;

use crate::models::{Document, Food, Item, MacroGroup, Macros, Meal, MealTarget, SplitMode};

use super::distribution;
use super::error::{PlanError, PlanResult};
use super::rounding::{finite_amount, finite_macros, round_to_5, GridRound};

/// Splits the document into the current profile's meal and the food list.
fn meal_and_foods(doc: &mut Document, index: usize) -> PlanResult<(&mut Meal, &[Food])> {
    let current = doc.current_profile_id;
    let Document {
        profiles, foods, ..
    } = doc;
    let profile = profiles
        .iter_mut()
        .find(|p| p.id == current)
        .ok_or(PlanError::NoCurrentProfile)?;
    let meal = profile
        .meals
        .get_mut(index)
        .ok_or(PlanError::MealNotFound(index + 1))?;
    Ok((meal, foods.as_slice()))
}

fn meal_mut(doc: &mut Document, index: usize) -> PlanResult<&mut Meal> {
    meal_and_foods(doc, index).map(|(meal, _)| meal)
}

fn lookup_food<'a>(foods: &'a [Food], key: &str) -> PlanResult<&'a Food> {
    if let Ok(id) = Uuid::parse_str(key.trim()) {
        if let Some(food) = foods.iter().find(|f| f.id == id) {
            return Ok(food);
        }
    }
    let lower = key.trim().to_lowercase();
    foods
        .iter()
        .find(|f| f.name.to_lowercase() == lower)
        .ok_or_else(|| PlanError::FoodNotFound(key.to_string()))
}

pub fn rename_meal(doc: &mut Document, index: usize, name: &str) -> PlanResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PlanError::EmptyName);
    }
    meal_mut(doc, index)?.name = name.to_string();
    Ok(())
}

/// Edits a meal's macro target directly. Only allowed in manual split mode.
pub fn set_meal_target(doc: &mut Document, index: usize, grams: Macros) -> PlanResult<()> {
    let grams = finite_macros(grams)?;
    let split_mode = doc
        .current_profile()
        .map(|p| p.split_mode)
        .ok_or(PlanError::NoCurrentProfile)?;
    if split_mode != SplitMode::Manual {
        return Err(PlanError::NotManualSplit);
    }
    meal_mut(doc, index)?.macros = MealTarget::from_grams(grams);
    Ok(())
}

/// Adds a food to a macro group with 0 g. A food appears at most once per group.
pub fn add_item(
    doc: &mut Document,
    index: usize,
    group: MacroGroup,
    food_key: &str,
) -> PlanResult<Uuid> {
    let (meal, foods) = meal_and_foods(doc, index)?;
    let food = lookup_food(foods, food_key)?;
    let items = meal.items.group_mut(group);
    if items.iter().any(|item| item.food_id == food.id) {
        return Err(PlanError::DuplicateItem {
            food: food.name.clone(),
            group,
        });
    }
    items.push(Item::new(food.id));
    meal.sync_active_variant();
    Ok(food.id)
}

pub fn remove_item(
    doc: &mut Document,
    index: usize,
    group: MacroGroup,
    food_key: &str,
) -> PlanResult<()> {
    let (meal, foods) = meal_and_foods(doc, index)?;
    let food = lookup_food(foods, food_key)?;
    let items = meal.items.group_mut(group);
    let before = items.len();
    items.retain(|item| item.food_id != food.id);
    if items.len() == before {
        return Err(PlanError::ItemNotFound {
            food: food.name.clone(),
            group,
        });
    }
    meal.sync_active_variant();
    Ok(())
}

/// Sets an item's grams by hand, clearing its `auto` flag.
///
/// With `snap_to_grid` the value is rounded to 5 g and the direction recorded.
pub fn set_item_grams(
    doc: &mut Document,
    index: usize,
    group: MacroGroup,
    food_key: &str,
    grams: f64,
) -> PlanResult<Item> {
    let grams = finite_amount(grams)?;
    let snap = doc.ui.snap_manual;
    let (meal, foods) = meal_and_foods(doc, index)?;
    let food = lookup_food(foods, food_key)?;
    let item = meal
        .items
        .group_mut(group)
        .iter_mut()
        .find(|item| item.food_id == food.id)
        .ok_or_else(|| PlanError::ItemNotFound {
            food: food.name.clone(),
            group,
        })?;
    if snap {
        let rounded = round_to_5(grams);
        item.grams = rounded.grams;
        item.approx_dir = Some(rounded.direction);
    } else {
        item.grams = grams;
        item.approx_dir = None;
    }
    item.auto = false;
    let updated = item.clone();
    meal.sync_active_variant();
    Ok(updated)
}

/// Sizes one item so it alone covers the meal's target for its group.
pub fn auto_fill_item(
    doc: &mut Document,
    index: usize,
    group: MacroGroup,
    food_key: &str,
) -> PlanResult<GridRound> {
    let (meal, foods) = meal_and_foods(doc, index)?;
    let food = lookup_food(foods, food_key)?;
    distribution::auto_fill_item(meal, group, food)
}

/// Single-item auto-fill of a whole group.
pub fn auto_fill_group(doc: &mut Document, index: usize, group: MacroGroup) -> PlanResult<GridRound> {
    let (meal, foods) = meal_and_foods(doc, index)?;
    distribution::auto_fill_group(meal, group, foods)
}

/// Clones the live items into a new variant and activates it.
pub fn new_variant(doc: &mut Document, index: usize) -> PlanResult<Uuid> {
    Ok(meal_mut(doc, index)?.new_variant_from_current())
}

/// Activates a variant by id or name.
pub fn switch_variant(doc: &mut Document, index: usize, key: &str) -> PlanResult<Uuid> {
    let meal = meal_mut(doc, index)?;
    let id = meal
        .find_variant(key)
        .map(|v| v.id)
        .ok_or_else(|| PlanError::VariantNotFound(key.to_string()))?;
    meal.switch_variant(id)?;
    Ok(id)
}

pub fn rename_variant(doc: &mut Document, index: usize, name: &str) -> PlanResult<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(PlanError::EmptyName);
    }
    meal_mut(doc, index)?.rename_active_variant(name);
    Ok(())
}

/// Deletes the active variant. Rejected for a meal's last variant.
pub fn delete_variant(doc: &mut Document, index: usize) -> PlanResult<()> {
    meal_mut(doc, index)?.delete_active_variant()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ApproxDirection;
    use crate::planner::foods::{create_food, FoodInput};

    fn doc_with_foods() -> Document {
        let mut doc = Document::seed();
        create_food(&mut doc, &FoodInput::new("Rice", 360.0, 79.0, 7.0, 0.6)).unwrap();
        create_food(&mut doc, &FoodInput::new("Chicken", 120.0, 0.0, 23.0, 2.6)).unwrap();
        create_food(&mut doc, &FoodInput::new("Oil", 884.0, 0.0, 0.0, 100.0)).unwrap();
        doc
    }

    fn meal(doc: &Document, index: usize) -> &Meal {
        &doc.current_profile().unwrap().meals[index]
    }

    #[test]
    fn test_add_item_rejects_duplicates() {
        let mut doc = doc_with_foods();
        add_item(&mut doc, 0, MacroGroup::Carbs, "rice").unwrap();
        let err = add_item(&mut doc, 0, MacroGroup::Carbs, "Rice").unwrap_err();
        assert!(matches!(err, PlanError::DuplicateItem { .. }));
        // the same food may still go in another group
        add_item(&mut doc, 0, MacroGroup::Protein, "Rice").unwrap();
        assert!(meal(&doc, 0).is_consistent());
    }

    #[test]
    fn test_add_item_unknown_meal_or_food() {
        let mut doc = doc_with_foods();
        assert_eq!(
            add_item(&mut doc, 9, MacroGroup::Carbs, "Rice"),
            Err(PlanError::MealNotFound(10))
        );
        assert!(matches!(
            add_item(&mut doc, 0, MacroGroup::Carbs, "Bread"),
            Err(PlanError::FoodNotFound(_))
        ));
    }

    #[test]
    fn test_set_item_grams_with_and_without_snap() {
        let mut doc = doc_with_foods();
        add_item(&mut doc, 1, MacroGroup::Protein, "Chicken").unwrap();

        let item = set_item_grams(&mut doc, 1, MacroGroup::Protein, "Chicken", 123.0).unwrap();
        assert_eq!(item.grams, 123.0);
        assert_eq!(item.approx_dir, None);
        assert!(!item.auto);

        doc.ui.snap_manual = true;
        let item = set_item_grams(&mut doc, 1, MacroGroup::Protein, "Chicken", 123.0).unwrap();
        assert_eq!(item.grams, 125.0);
        assert_eq!(item.approx_dir, Some(ApproxDirection::Up));
        assert!(meal(&doc, 1).is_consistent());
    }

    #[test]
    fn test_remove_missing_item() {
        let mut doc = doc_with_foods();
        let err = remove_item(&mut doc, 0, MacroGroup::Fat, "Oil").unwrap_err();
        assert!(matches!(err, PlanError::ItemNotFound { .. }));
    }

    #[test]
    fn test_meal_target_requires_manual_split() {
        let mut doc = doc_with_foods();
        let grams = Macros::new(50.0, 30.0, 10.0);
        assert_eq!(
            set_meal_target(&mut doc, 0, grams),
            Err(PlanError::NotManualSplit)
        );
        doc.current_profile_mut().unwrap().split_mode = SplitMode::Manual;
        set_meal_target(&mut doc, 0, grams).unwrap();
        assert_eq!(meal(&doc, 0).macros.kcal, 50.0 * 4.0 + 30.0 * 4.0 + 10.0 * 9.0);
    }

    #[test]
    fn test_auto_fill_through_document() {
        let mut doc = doc_with_foods();
        doc.current_profile_mut().unwrap().split_mode = SplitMode::Manual;
        set_meal_target(&mut doc, 0, Macros::new(0.0, 46.0, 10.0)).unwrap();

        let rounded = auto_fill_group(&mut doc, 0, MacroGroup::Protein).unwrap();
        assert_eq!(rounded.grams, 200.0);
        add_item(&mut doc, 0, MacroGroup::Fat, "Oil").unwrap();
        let rounded = auto_fill_item(&mut doc, 0, MacroGroup::Fat, "Oil").unwrap();
        assert_eq!(rounded.grams, 10.0);
        assert!(meal(&doc, 0).is_consistent());
    }

    #[test]
    fn test_variant_sequence_keeps_invariant() {
        let mut doc = doc_with_foods();
        add_item(&mut doc, 0, MacroGroup::Carbs, "Rice").unwrap();
        set_item_grams(&mut doc, 0, MacroGroup::Carbs, "Rice", 80.0).unwrap();
        let second = new_variant(&mut doc, 0).unwrap();
        remove_item(&mut doc, 0, MacroGroup::Carbs, "Rice").unwrap();
        add_item(&mut doc, 0, MacroGroup::Fat, "Oil").unwrap();
        rename_variant(&mut doc, 0, "Light").unwrap();
        assert!(meal(&doc, 0).is_consistent());

        switch_variant(&mut doc, 0, "Type 1").unwrap();
        assert_eq!(meal(&doc, 0).items.carbs[0].grams, 80.0);
        assert!(meal(&doc, 0).items.fat.is_empty());
        assert!(meal(&doc, 0).is_consistent());

        switch_variant(&mut doc, 0, &second.to_string()).unwrap();
        delete_variant(&mut doc, 0).unwrap();
        assert_eq!(meal(&doc, 0).variants.len(), 1);
        assert_eq!(meal(&doc, 0).items.carbs.len(), 1);
        assert!(meal(&doc, 0).is_consistent());
        assert_eq!(delete_variant(&mut doc, 0), Err(PlanError::LastVariant));
    }

    #[test]
    fn test_non_finite_grams_rejected() {
        let mut doc = doc_with_foods();
        add_item(&mut doc, 1, MacroGroup::Protein, "Chicken").unwrap();
        let before = doc.clone();
        assert_eq!(
            set_item_grams(&mut doc, 1, MacroGroup::Protein, "Chicken", f64::INFINITY),
            Err(PlanError::InvalidAmount(f64::INFINITY))
        );
        doc.ui.snap_manual = true;
        assert!(set_item_grams(&mut doc, 1, MacroGroup::Protein, "Chicken", f64::NAN).is_err());
        doc.ui.snap_manual = false;
        assert_eq!(doc, before);

        doc.current_profile_mut().unwrap().split_mode = SplitMode::Manual;
        let before = doc.clone();
        let err = set_meal_target(&mut doc, 0, Macros::new(f64::INFINITY, 0.0, 0.0)).unwrap_err();
        assert_eq!(err, PlanError::InvalidAmount(f64::INFINITY));
        assert_eq!(doc, before);
    }

    #[test]
    fn test_auto_fill_from_vanishing_content_fails() {
        let mut doc = doc_with_foods();
        create_food(&mut doc, &FoodInput::new("Trace", 0.0, 0.0, 1e-310, 0.0)).unwrap();
        doc.current_profile_mut().unwrap().split_mode = SplitMode::Manual;
        set_meal_target(&mut doc, 0, Macros::new(0.0, 46.0, 0.0)).unwrap();
        add_item(&mut doc, 0, MacroGroup::Protein, "Trace").unwrap();

        let err = auto_fill_item(&mut doc, 0, MacroGroup::Protein, "Trace").unwrap_err();
        assert!(matches!(err, PlanError::InvalidAmount(v) if v.is_infinite()));
        assert_eq!(meal(&doc, 0).items.protein[0].grams, 0.0);
    }
}
