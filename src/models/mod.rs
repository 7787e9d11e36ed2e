mod document;
mod food;
mod item;
mod macros;
mod meal;
mod profile;

pub use document::{Document, GroupFlags, Meta, PreviewPrefs, UiPrefs, SCHEMA_VERSION};
pub use food::{dominant_group, parse_amount, Food};
pub use item::{ApproxDirection, GroupedItems, Item};
pub use macros::{
    fmt_grams, MacroGroup, Macros, MealTarget, KCAL_PER_G_CARBS, KCAL_PER_G_FAT,
    KCAL_PER_G_PROTEIN,
};
pub use meal::{Meal, Variant, VariantOpError};
pub use profile::{Factors, MacroMode, PercentageRow, Phase, PhaseFactors, Profile, SplitMode};
