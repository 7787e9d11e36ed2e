//! Validation errors for planning operations.
//!
//! Every operation that returns one of these leaves the document untouched.

use thiserror::Error;

use crate::models::{MacroGroup, VariantOpError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Name cannot be empty")]
    EmptyName,

    #[error("Food not found: {0}")]
    FoodNotFound(String),

    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("No current profile")]
    NoCurrentProfile,

    #[error("At least one profile must exist")]
    LastProfile,

    #[error("Meal {0} does not exist")]
    MealNotFound(usize),

    #[error("At least one variant must exist")]
    LastVariant,

    #[error("Variant not found: {0}")]
    VariantNotFound(String),

    #[error("{food} is already in the {group} group of this meal")]
    DuplicateItem { food: String, group: MacroGroup },

    #[error("{food} is not in the {group} group of this meal")]
    ItemNotFound { food: String, group: MacroGroup },

    #[error("Cannot satisfy target from zero-content food: {food} has no {group}")]
    ZeroContent { food: String, group: MacroGroup },

    #[error("No food available in group {0}")]
    NoFoodInGroup(MacroGroup),

    #[error(
        "Percentages must sum to 100 in every column (carbs {carbs}%, protein {protein}%, fat {fat}%)"
    )]
    PercentagesNotBalanced { carbs: u64, protein: u64, fat: u64 },

    #[error("Distribution can only be applied in percent split mode")]
    NotPercentSplit,

    #[error("Meal targets can only be edited in manual split mode")]
    NotManualSplit,

    #[error("Daily macros are derived automatically; switch the profile to manual macro mode first")]
    AutoMacroMode,

    #[error("Meal count must be at least 1")]
    InvalidMealCount,

    #[error("Amount must be a finite number, got {0}")]
    InvalidAmount(f64),
}

impl From<VariantOpError> for PlanError {
    fn from(err: VariantOpError) -> Self {
        match err {
            VariantOpError::LastVariant => PlanError::LastVariant,
            VariantOpError::NotFound(id) => PlanError::VariantNotFound(id.to_string()),
        }
    }
}

pub type PlanResult<T> = Result<T, PlanError>;

/// A malformed import payload. Nothing is applied when one is returned.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Expected a JSON array of foods")]
    NotAnArray,

    #[error("Unrecognized bundle: expected `profiles` or `profile`")]
    UnknownBundle,

    #[error("Bundle contains no profiles")]
    EmptyBundle,

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),
}
