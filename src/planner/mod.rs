//! Planning operations on a [`Document`](crate::models::Document).
//!
//! Everything here is synchronous and pure with respect to I/O. Operations
//! that fail leave the document as it was.

pub mod distribution;
mod error;
pub mod foods;
pub mod meals;
pub mod profiles;
pub mod rounding;

pub use distribution::{
    auto_macros, daily_summary, percent_totals, validate_percentages, DailySummary, MealSummary,
    PercentTotals, SUMMARY_TOLERANCE_G,
};
pub use error::{ImportError, PlanError, PlanResult};
pub use foods::{FoodFormat, FoodInput, ImportSummary};
pub use profiles::TargetsUpdate;
pub use rounding::{
    finite_amount, group_totals, item_energy, round_to_5, round_to_grid, GridRound, GRID_GRAMS,
};
