//! Daily targets, meal split and auto-fill.

use std::fmt;

use crate::models::{
    fmt_grams, Food, Item, MacroGroup, MacroMode, Macros, Meal, MealTarget, Profile, SplitMode,
    KCAL_PER_G_CARBS, KCAL_PER_G_FAT, KCAL_PER_G_PROTEIN,
};

use super::error::{PlanError, PlanResult};
use super::rounding::{group_totals, round_to_5, GridRound};

/// Absolute tolerance, in grams, between summed meal targets and the daily target.
pub const SUMMARY_TOLERANCE_G: f64 = 0.5;

/// Daily macro targets derived from weight, kcal target and phase factors.
///
/// Protein and fat come from the factors; carbs fill the remaining kcal.
pub fn auto_macros(profile: &Profile) -> Macros {
    let factors = profile.factors.for_phase(profile.phase);
    let protein = factors.protein * profile.weight;
    let fat = factors.fat * profile.weight;
    let carbs = ((profile.kcal_target - protein * KCAL_PER_G_PROTEIN - fat * KCAL_PER_G_FAT)
        / KCAL_PER_G_CARBS)
        .max(0.0);
    Macros::new(carbs.round(), protein.round(), fat.round())
}

/// Re-derives daily targets when the profile is in auto macro mode.
pub fn refresh_auto_macros(profile: &mut Profile) {
    if profile.macro_mode == MacroMode::Auto {
        profile.macros = auto_macros(profile);
    }
}

/// Column sums of a profile's percentage rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PercentTotals {
    pub carbs: u64,
    pub protein: u64,
    pub fat: u64,
}

impl PercentTotals {
    pub fn get(&self, group: MacroGroup) -> u64 {
        match group {
            MacroGroup::Carbs => self.carbs,
            MacroGroup::Protein => self.protein,
            MacroGroup::Fat => self.fat,
        }
    }

    /// Every column sums to exactly 100.
    pub fn is_balanced(&self) -> bool {
        self.carbs == 100 && self.protein == 100 && self.fat == 100
    }
}

pub fn percent_totals(profile: &Profile) -> PercentTotals {
    let rows = &profile.percentages;
    let column = |group: MacroGroup| rows.iter().map(|r| u64::from(r.get(group))).sum();
    PercentTotals {
        carbs: column(MacroGroup::Carbs),
        protein: column(MacroGroup::Protein),
        fat: column(MacroGroup::Fat),
    }
}

pub fn validate_percentages(profile: &Profile) -> PlanResult<()> {
    let totals = percent_totals(profile);
    if totals.is_balanced() {
        Ok(())
    } else {
        Err(PlanError::PercentagesNotBalanced {
            carbs: totals.carbs,
            protein: totals.protein,
            fat: totals.fat,
        })
    }
}

/// Splits the daily targets across meals by the percentage rows.
///
/// Refused unless the profile is in percent split mode and every column sums
/// to 100. Meals take their row's name when it has one.
pub fn apply_distribution(profile: &mut Profile) -> PlanResult<()> {
    if profile.split_mode != SplitMode::Percent {
        return Err(PlanError::NotPercentSplit);
    }
    profile.ensure_meals();
    profile.ensure_percentages();
    validate_percentages(profile)?;

    let daily = profile.macros;
    for (meal, row) in profile.meals.iter_mut().zip(profile.percentages.iter()) {
        if !row.name.trim().is_empty() {
            meal.name = row.name.clone();
        }
        let mut grams = Macros::default();
        for group in MacroGroup::ALL {
            grams.set(group, (daily.get(group) * row.get(group) as f64 / 100.0).round());
        }
        meal.macros = MealTarget::from_grams(grams);
    }
    Ok(())
}

/// Rewrites every percentage row so each column sums to exactly 100.
///
/// The remainder of the integer split goes to the first rows.
pub fn equalize_percentages(profile: &mut Profile) {
    profile.ensure_percentages();
    let n = profile.percentages.len() as u32;
    let base = 100 / n;
    let remainder = 100 % n;
    for (i, row) in profile.percentages.iter_mut().enumerate() {
        let share = if (i as u32) < remainder { base + 1 } else { base };
        for group in MacroGroup::ALL {
            row.set(group, share);
        }
    }
}

fn fill_grams(meal: &Meal, group: MacroGroup, food: &Food) -> PlanResult<GridRound> {
    let per_100 = food.per_100(group);
    if per_100 <= 0.0 {
        return Err(PlanError::ZeroContent {
            food: food.name.clone(),
            group,
        });
    }
    let exact = meal.macros.grams.get(group) / (per_100 / 100.0);
    if !exact.is_finite() {
        return Err(PlanError::InvalidAmount(exact));
    }
    Ok(round_to_5(exact))
}

fn set_auto(item: &mut Item, rounded: GridRound) {
    item.grams = rounded.grams;
    item.auto = true;
    item.approx_dir = Some(rounded.direction);
}

/// Sizes one existing item so it alone covers the meal's target for `group`.
pub fn auto_fill_item(
    meal: &mut Meal,
    group: MacroGroup,
    food: &Food,
) -> PlanResult<GridRound> {
    let index = meal
        .items
        .group(group)
        .iter()
        .position(|item| item.food_id == food.id)
        .ok_or_else(|| PlanError::ItemNotFound {
            food: food.name.clone(),
            group,
        })?;
    let rounded = fill_grams(meal, group, food)?;
    set_auto(&mut meal.items.group_mut(group)[index], rounded);
    meal.sync_active_variant();
    Ok(rounded)
}

/// Sizes the first item of `group` to cover the meal's target.
///
/// An empty group first gets the first food whose dominant group is `group`.
pub fn auto_fill_group(meal: &mut Meal, group: MacroGroup, foods: &[Food]) -> PlanResult<GridRound> {
    let food = match meal.items.group(group).first() {
        Some(item) => foods
            .iter()
            .find(|f| f.id == item.food_id)
            .ok_or_else(|| PlanError::FoodNotFound(item.food_id.to_string()))?,
        None => foods
            .iter()
            .find(|f| f.group == group)
            .ok_or(PlanError::NoFoodInGroup(group))?,
    };
    let rounded = fill_grams(meal, group, food)?;
    let items = meal.items.group_mut(group);
    if items.is_empty() {
        items.push(Item::new(food.id));
    }
    set_auto(&mut items[0], rounded);
    meal.sync_active_variant();
    Ok(rounded)
}

/// Target and actual composition of one meal.
#[derive(Debug, Clone, PartialEq)]
pub struct MealSummary {
    pub name: String,
    pub target: MealTarget,
    pub actual: MealTarget,
}

/// Day totals compared against the profile's daily targets.
#[derive(Debug, Clone, PartialEq)]
pub struct DailySummary {
    /// Sum of the meal targets.
    pub totals: MealTarget,
    pub daily: MealTarget,
    pub off_target: Vec<MacroGroup>,
    pub meals: Vec<MealSummary>,
}

impl DailySummary {
    pub fn is_aligned(&self) -> bool {
        self.off_target.is_empty()
    }

    /// Human-readable warnings, one per group outside tolerance.
    pub fn warnings(&self) -> Vec<String> {
        self.off_target
            .iter()
            .map(|group| {
                format!(
                    "Daily {} differ from target ({} g planned, {} g target)",
                    group,
                    fmt_grams(self.totals.grams.get(*group)),
                    fmt_grams(self.daily.grams.get(*group))
                )
            })
            .collect()
    }
}

pub fn daily_summary(profile: &Profile, foods: &[Food]) -> DailySummary {
    let mut sum = Macros::default();
    let mut meals = Vec::with_capacity(profile.meals.len());
    for meal in &profile.meals {
        for group in MacroGroup::ALL {
            sum.set(group, sum.get(group) + meal.macros.grams.get(group));
        }
        meals.push(MealSummary {
            name: meal.name.clone(),
            target: meal.macros,
            actual: group_totals(&meal.items, foods),
        });
    }
    let off_target = MacroGroup::ALL
        .into_iter()
        .filter(|g| (sum.get(*g) - profile.macros.get(*g)).abs() > SUMMARY_TOLERANCE_G)
        .collect();

    DailySummary {
        totals: MealTarget::from_grams(sum),
        daily: MealTarget::from_grams(profile.macros),
        off_target,
        meals,
    }
}

impl fmt::Display for DailySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, meal) in self.meals.iter().enumerate() {
            writeln!(
                f,
                "{}. {:<20} target {} kcal - {}",
                i + 1,
                meal.name,
                fmt_grams(meal.target.kcal),
                meal.target.grams
            )?;
            writeln!(
                f,
                "   {:<20} actual {} kcal - {}",
                "",
                fmt_grams(meal.actual.kcal),
                meal.actual.grams
            )?;
        }
        writeln!(
            f,
            "Day: {} kcal - {}",
            fmt_grams(self.totals.kcal),
            self.totals.grams
        )?;
        let warnings = self.warnings();
        if warnings.is_empty() {
            write!(f, "Aligned with daily targets")
        } else {
            write!(f, "Warning: {}", warnings.join("; "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApproxDirection, Phase};

    fn profile_with_macros(c: f64, p: f64, f: f64) -> Profile {
        let mut profile = Profile::new("P");
        profile.macro_mode = MacroMode::Manual;
        profile.macros = Macros::new(c, p, f);
        profile
    }

    #[test]
    fn test_auto_macros_bulk() {
        let mut profile = Profile::new("P");
        profile.weight = 75.0;
        // 2400 kcal, bulk 1.6 / 1.0
        let macros = auto_macros(&profile);
        assert_eq!(macros.protein, 120.0);
        assert_eq!(macros.fat, 75.0);
        assert_eq!(macros.carbs, 311.0);
    }

    #[test]
    fn test_auto_macros_cut() {
        let mut profile = Profile::new("P");
        profile.phase = Phase::Cut;
        profile.weight = 80.0;
        profile.kcal_target = 2000.0;
        let macros = auto_macros(&profile);
        assert_eq!(macros.protein, 176.0);
        assert_eq!(macros.fat, 64.0);
        assert_eq!(macros.carbs, 180.0);
    }

    #[test]
    fn test_auto_macros_carbs_never_negative() {
        let mut profile = Profile::new("P");
        profile.kcal_target = 500.0;
        assert_eq!(auto_macros(&profile).carbs, 0.0);
    }

    #[test]
    fn test_refresh_skips_manual_mode() {
        let mut profile = profile_with_macros(1.0, 2.0, 3.0);
        refresh_auto_macros(&mut profile);
        assert_eq!(profile.macros, Macros::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn test_apply_distribution_balanced_rows() {
        let mut profile = profile_with_macros(300.0, 150.0, 70.0);
        profile.meals_count = 2;
        profile.ensure_meals();
        profile.ensure_percentages();
        for row in &mut profile.percentages {
            row.carbs = 50;
            row.protein = 50;
            row.fat = 50;
        }
        profile.percentages[0].name = "Breakfast".to_string();

        apply_distribution(&mut profile).unwrap();
        let meal = &profile.meals[0];
        assert_eq!(meal.name, "Breakfast");
        assert_eq!(meal.macros.grams, Macros::new(150.0, 75.0, 35.0));
        assert_eq!(meal.macros.kcal, 150.0 * 4.0 + 75.0 * 4.0 + 35.0 * 9.0);
    }

    #[test]
    fn test_apply_distribution_rejects_unbalanced() {
        let mut profile = profile_with_macros(300.0, 150.0, 70.0);
        profile.meals_count = 2;
        profile.ensure_meals();
        profile.ensure_percentages();
        profile.percentages[0].carbs = 40;
        profile.percentages[1].carbs = 50;
        let before = profile.clone();

        let err = apply_distribution(&mut profile).unwrap_err();
        assert!(matches!(err, PlanError::PercentagesNotBalanced { carbs: 90, .. }));
        assert_eq!(profile.meals, before.meals);
    }

    #[test]
    fn test_apply_distribution_rejects_manual_split() {
        let mut profile = profile_with_macros(300.0, 150.0, 70.0);
        profile.split_mode = SplitMode::Manual;
        assert_eq!(
            apply_distribution(&mut profile),
            Err(PlanError::NotPercentSplit)
        );
    }

    #[test]
    fn test_default_three_meal_rows_are_unbalanced() {
        // round(100 / 3) = 33 per row
        let profile = Profile::new("P");
        assert_eq!(percent_totals(&profile).carbs, 99);
        assert!(validate_percentages(&profile).is_err());
    }

    #[test]
    fn test_percent_totals_do_not_wrap() {
        let mut profile = Profile::new("Plan");
        profile.split_mode = SplitMode::Percent;
        profile.percentages[0].carbs = 4_294_967_246;
        profile.percentages[1].carbs = 150;
        profile.percentages[2].carbs = u32::MAX;

        let totals = percent_totals(&profile);
        assert_eq!(totals.carbs, 4_294_967_246 + 150 + u64::from(u32::MAX));
        assert!(!totals.is_balanced());
        assert!(validate_percentages(&profile).is_err());
    }

    #[test]
    fn test_equalize_percentages() {
        let mut profile = Profile::new("P");
        equalize_percentages(&mut profile);
        let rows: Vec<u32> = profile.percentages.iter().map(|r| r.protein).collect();
        assert_eq!(rows, vec![34, 33, 33]);
        assert!(percent_totals(&profile).is_balanced());
    }

    #[test]
    fn test_auto_fill_item_exact() {
        let food = Food::new("Half carbs", 200.0, 50.0, 0.0, 0.0);
        let mut meal = Meal::new("Lunch");
        meal.macros = MealTarget::from_grams(Macros::new(40.0, 0.0, 0.0));
        meal.items.carbs.push(Item::new(food.id));

        let rounded = auto_fill_item(&mut meal, MacroGroup::Carbs, &food).unwrap();
        assert_eq!(rounded.grams, 80.0);
        assert_eq!(rounded.direction, ApproxDirection::Down);
        assert!(meal.items.carbs[0].auto);
        assert!(meal.is_consistent());
    }

    #[test]
    fn test_auto_fill_item_zero_content() {
        let oil = Food::new("Olive oil", 884.0, 0.0, 0.0, 100.0);
        let mut meal = Meal::new("Lunch");
        meal.macros = MealTarget::from_grams(Macros::new(40.0, 0.0, 0.0));
        meal.items.carbs.push(Item::new(oil.id));
        meal.sync_active_variant();
        let before = meal.clone();

        let err = auto_fill_item(&mut meal, MacroGroup::Carbs, &oil).unwrap_err();
        assert!(matches!(err, PlanError::ZeroContent { .. }));
        assert_eq!(meal, before);
    }

    #[test]
    fn test_auto_fill_group_picks_first_food_in_group() {
        let chicken = Food::new("Chicken", 120.0, 0.0, 23.0, 2.6);
        let rice = Food::new("Rice", 360.0, 79.0, 7.0, 0.6);
        let mut meal = Meal::new("Dinner");
        meal.macros = MealTarget::from_grams(Macros::new(79.0, 0.0, 0.0));

        let foods = vec![chicken, rice.clone()];
        let rounded = auto_fill_group(&mut meal, MacroGroup::Carbs, &foods).unwrap();
        assert_eq!(rounded.grams, 100.0);
        assert_eq!(meal.items.carbs[0].food_id, rice.id);
        assert!(meal.is_consistent());
    }

    #[test]
    fn test_auto_fill_group_without_candidates() {
        let chicken = Food::new("Chicken", 120.0, 0.0, 23.0, 2.6);
        let mut meal = Meal::new("Dinner");
        let err = auto_fill_group(&mut meal, MacroGroup::Fat, &[chicken]).unwrap_err();
        assert_eq!(err, PlanError::NoFoodInGroup(MacroGroup::Fat));
        assert!(meal.items.fat.is_empty());
    }

    #[test]
    fn test_daily_summary_tolerance() {
        let mut profile = profile_with_macros(300.0, 150.0, 70.0);
        profile.meals_count = 2;
        profile.ensure_meals();
        profile.meals[0].macros = MealTarget::from_grams(Macros::new(150.0, 75.0, 35.0));
        profile.meals[1].macros = MealTarget::from_grams(Macros::new(150.4, 74.0, 35.0));

        let summary = daily_summary(&profile, &[]);
        assert_eq!(summary.off_target, vec![MacroGroup::Protein]);
        assert_eq!(summary.warnings().len(), 1);
        assert!(summary.to_string().contains("Warning"));
    }

    #[test]
    fn test_daily_summary_aligned() {
        let mut profile = profile_with_macros(100.0, 50.0, 20.0);
        profile.meals_count = 1;
        profile.ensure_meals();
        profile.meals[0].macros = MealTarget::from_grams(Macros::new(100.0, 50.0, 20.0));
        let summary = daily_summary(&profile, &[]);
        assert!(summary.is_aligned());
        assert!(summary.to_string().ends_with("Aligned with daily targets"));
    }
}
