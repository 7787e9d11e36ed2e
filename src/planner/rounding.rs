//! Grid rounding and composition totals.

use crate::models::{ApproxDirection, Food, GroupedItems, Item, MacroGroup, Macros, MealTarget};

use super::error::{PlanError, PlanResult};

/// Grid for every computed food quantity, in grams.
pub const GRID_GRAMS: f64 = 5.0;

/// A quantity snapped to the grid and the way it moved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridRound {
    pub grams: f64,
    pub direction: ApproxDirection,
}

/// Checks a user-entered quantity. Non-finite values are rejected and
/// negatives clamp to 0.
pub fn finite_amount(value: f64) -> PlanResult<f64> {
    if value.is_finite() {
        Ok(value.max(0.0))
    } else {
        Err(PlanError::InvalidAmount(value))
    }
}

/// Per-group [`finite_amount`].
pub fn finite_macros(macros: Macros) -> PlanResult<Macros> {
    Ok(Macros::new(
        finite_amount(macros.carbs)?,
        finite_amount(macros.protein)?,
        finite_amount(macros.fat)?,
    ))
}

/// Rounds `exact` to the nearest multiple of `grid`.
///
/// Negative and non-finite input is clamped to 0. The candidate with the strictly
/// smaller error wins; an exact tie goes to the lower multiple.
pub fn round_to_grid(exact: f64, grid: f64) -> GridRound {
    let exact = if exact.is_finite() { exact.max(0.0) } else { 0.0 };
    if !(grid > 0.0) {
        return GridRound {
            grams: exact,
            direction: ApproxDirection::Down,
        };
    }
    let floor = (exact / grid).floor() * grid;
    let ceil = (exact / grid).ceil() * grid;
    if (ceil - exact) < (exact - floor) {
        GridRound {
            grams: ceil,
            direction: ApproxDirection::Up,
        }
    } else {
        GridRound {
            grams: floor,
            direction: ApproxDirection::Down,
        }
    }
}

/// Rounds to the standard 5 g grid.
pub fn round_to_5(exact: f64) -> GridRound {
    round_to_grid(exact, GRID_GRAMS)
}

/// Macro grams contributed by `grams` of `food`.
pub fn food_macros(food: &Food, grams: f64) -> Macros {
    let mut macros = Macros::default();
    for group in MacroGroup::ALL {
        macros.set(group, grams * food.per_100(group) / 100.0);
    }
    macros
}

/// Energy of one item, from its macro grams.
pub fn item_energy(item: &Item, food: &Food) -> f64 {
    food_macros(food, item.grams).kcal()
}

/// Sums the composition of every item across all groups.
///
/// Items whose food is missing contribute nothing.
pub fn group_totals(items: &GroupedItems, foods: &[Food]) -> MealTarget {
    let mut sum = Macros::default();
    for (_, item) in items.iter() {
        let Some(food) = foods.iter().find(|f| f.id == item.food_id) else {
            continue;
        };
        let macros = food_macros(food, item.grams);
        for group in MacroGroup::ALL {
            sum.set(group, sum.get(group) + macros.get(group));
        }
    }
    MealTarget::from_grams(sum)
}
