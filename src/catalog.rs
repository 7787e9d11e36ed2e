//! Bundled reference foods and their versioned migration.
//!
//! Values are per 100 g. They are a convenience starting point, not a
//! nutritional reference.

use std::collections::HashSet;

use tracing::info;
use uuid::Uuid;

use crate::models::{Document, Food};

/// Bumped whenever the bundled list changes.
pub const CATALOG_VERSION: &str = "1.2";

// (name, kcal, carbs, protein, fat)
const CATALOG: &[(&str, f64, f64, f64, f64)] = &[
    ("White rice, raw", 360.0, 79.0, 7.0, 0.6),
    ("Basmati rice, raw", 356.0, 78.0, 8.0, 0.8),
    ("Dry pasta, raw", 353.0, 72.0, 13.0, 1.5),
    ("Rolled oats", 371.0, 59.0, 13.0, 7.0),
    ("Quinoa, raw", 368.0, 64.0, 14.0, 6.0),
    ("Pearled spelt, raw", 335.0, 67.0, 15.0, 2.0),
    ("Pearl barley, raw", 354.0, 77.0, 10.0, 1.2),
    ("White rice, cooked", 130.0, 28.0, 2.7, 0.3),
    ("Pasta, cooked", 131.0, 25.0, 5.0, 1.1),
    ("Potatoes, boiled", 87.0, 20.0, 1.9, 0.1),
    ("Sweet potatoes, cooked", 90.0, 21.0, 2.0, 0.2),
    ("Lentils, cooked", 116.0, 20.0, 9.0, 0.4),
    ("Chickpeas, cooked", 164.0, 27.4, 8.9, 2.6),
    ("Borlotti beans, cooked", 127.0, 22.8, 8.7, 0.5),
    ("Black beans, cooked", 132.0, 23.7, 8.9, 0.5),
    ("Peas, cooked", 84.0, 15.0, 5.4, 0.2),
    ("Chicken breast", 120.0, 0.0, 23.0, 2.6),
    ("Turkey breast", 114.0, 0.0, 24.0, 1.0),
    ("Lean beef (5% fat)", 137.0, 0.0, 20.0, 6.0),
    ("Pork loin", 143.0, 0.0, 21.0, 6.0),
    ("Cod", 82.0, 0.0, 18.0, 0.7),
    ("Atlantic salmon", 208.0, 0.0, 20.0, 13.0),
    ("Fresh tuna", 144.0, 0.0, 23.0, 4.9),
    ("Whole eggs", 143.0, 0.7, 12.6, 10.6),
    ("Egg whites", 52.0, 0.7, 10.9, 0.2),
    ("Greek yogurt 0%", 59.0, 3.6, 10.0, 0.4),
    ("Skim milk", 34.0, 5.0, 3.4, 0.1),
    ("Extra virgin olive oil", 884.0, 0.0, 0.0, 100.0),
    ("Avocado", 160.0, 9.0, 2.0, 15.0),
    ("Almonds", 579.0, 21.6, 21.2, 49.9),
    ("Walnuts", 654.0, 13.7, 15.2, 65.2),
    ("Hazelnuts", 628.0, 16.7, 15.0, 60.8),
    ("Pistachios", 560.0, 28.0, 20.0, 45.0),
    ("Cashews", 553.0, 30.0, 18.0, 44.0),
    ("Chia seeds", 486.0, 42.0, 16.0, 31.0),
    ("Flax seeds", 534.0, 29.0, 18.0, 42.0),
    ("Pumpkin seeds", 559.0, 11.0, 30.0, 49.0),
    ("Banana", 89.0, 23.0, 1.1, 0.3),
    ("Apple", 52.0, 14.0, 0.3, 0.2),
    ("Orange", 47.0, 12.0, 0.9, 0.1),
    ("Pear", 57.0, 15.0, 0.4, 0.1),
    ("Strawberries", 32.0, 7.7, 0.7, 0.3),
    ("Blueberries", 57.0, 14.0, 0.7, 0.3),
    ("Kiwi", 61.0, 15.0, 1.1, 0.5),
    ("Spinach", 23.0, 3.6, 2.9, 0.4),
    ("Broccoli", 34.0, 7.0, 2.8, 0.4),
    ("Zucchini", 17.0, 3.1, 1.2, 0.3),
    ("Tomatoes", 18.0, 3.9, 0.9, 0.2),
    ("Carrots", 41.0, 10.0, 0.9, 0.2),
    ("Red peppers", 31.0, 6.0, 1.0, 0.3),
    ("Eggplant", 25.0, 6.0, 1.0, 0.2),
    ("Lettuce", 15.0, 2.9, 1.4, 0.2),
    ("Whole wheat bread", 247.0, 41.0, 8.5, 2.5),
];

/// Stable id of a bundled food, identical on every device.
pub fn catalog_id(name: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_OID, format!("macroplan/food/{}", name).as_bytes())
}

/// The bundled foods, flagged as such.
pub fn catalog_foods() -> Vec<Food> {
    CATALOG
        .iter()
        .map(|&(name, kcal, carbs, protein, fat)| {
            let mut food = Food::new(name, kcal, carbs, protein, fat);
            food.id = catalog_id(name);
            food.bundled = true;
            food
        })
        .collect()
}

/// Replaces previously bundled foods with the current catalog.
///
/// User foods are kept, and a catalog food whose name collides with one of
/// them is skipped. Items pointing at foods that no longer exist are pruned.
/// Returns `false` when the document is already at [`CATALOG_VERSION`].
pub fn migrate_catalog(doc: &mut Document) -> bool {
    if doc.foods_version.as_deref() == Some(CATALOG_VERSION) {
        return false;
    }

    doc.foods.retain(|f| !f.bundled);
    let user_names: HashSet<String> = doc.foods.iter().map(|f| f.name.to_lowercase()).collect();
    let mut added = 0;
    for food in catalog_foods() {
        if !user_names.contains(&food.name.to_lowercase()) {
            doc.foods.push(food);
            added += 1;
        }
    }
    let pruned = doc.prune_dangling_items();
    doc.foods_version = Some(CATALOG_VERSION.to_string());

    info!(
        version = CATALOG_VERSION,
        added, pruned, "Migrated bundled food catalog"
    );
    true
}
