//! Profile management and daily target settings.

use uuid::Uuid;

use crate::models::{
    Document, Factors, MacroGroup, MacroMode, Macros, Phase, Profile, SplitMode,
};

use super::distribution::{apply_distribution, equalize_percentages, refresh_auto_macros};
use super::error::{PlanError, PlanResult};
use super::rounding::{finite_amount, finite_macros};

pub(crate) fn current_mut(doc: &mut Document) -> PlanResult<&mut Profile> {
    doc.current_profile_mut().ok_or(PlanError::NoCurrentProfile)
}

fn non_empty(name: &str) -> PlanResult<String> {
    let name = name.trim();
    if name.is_empty() {
        Err(PlanError::EmptyName)
    } else {
        Ok(name.to_string())
    }
}

/// Finds a profile by id or case-insensitive name.
pub fn find_profile<'a>(doc: &'a Document, key: &str) -> Option<&'a Profile> {
    if let Ok(id) = Uuid::parse_str(key.trim()) {
        if let Some(profile) = doc.profiles.iter().find(|p| p.id == id) {
            return Some(profile);
        }
    }
    let key = key.trim().to_lowercase();
    doc.profiles.iter().find(|p| p.name.to_lowercase() == key)
}

/// Creates a profile with default settings and makes it current.
pub fn add_profile(doc: &mut Document, name: &str) -> PlanResult<Uuid> {
    let mut profile = Profile::new(non_empty(name)?);
    refresh_auto_macros(&mut profile);
    let id = profile.id;
    doc.profiles.push(profile);
    doc.current_profile_id = id;
    Ok(id)
}

pub fn rename_profile(doc: &mut Document, name: &str) -> PlanResult<()> {
    let name = non_empty(name)?;
    current_mut(doc)?.name = name;
    Ok(())
}

pub fn select_profile(doc: &mut Document, key: &str) -> PlanResult<Uuid> {
    let id = find_profile(doc, key)
        .map(|p| p.id)
        .ok_or_else(|| PlanError::ProfileNotFound(key.to_string()))?;
    doc.current_profile_id = id;
    Ok(id)
}

/// Deletes the current profile. The first remaining one becomes current.
pub fn delete_current_profile(doc: &mut Document) -> PlanResult<Profile> {
    if doc.profiles.len() <= 1 {
        return Err(PlanError::LastProfile);
    }
    let index = doc
        .profiles
        .iter()
        .position(|p| p.id == doc.current_profile_id)
        .ok_or(PlanError::NoCurrentProfile)?;
    let removed = doc.profiles.remove(index);
    doc.current_profile_id = doc.profiles[0].id;
    Ok(removed)
}

/// Fields of the daily target form. `None` leaves a field unchanged.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TargetsUpdate {
    pub phase: Option<Phase>,
    pub weight: Option<f64>,
    pub kcal_target: Option<f64>,
    pub macro_mode: Option<MacroMode>,
}

/// Updates phase, weight, kcal target and macro mode.
///
/// In auto mode the daily macros are re-derived.
pub fn set_targets(doc: &mut Document, update: TargetsUpdate) -> PlanResult<()> {
    let weight = update.weight.map(finite_amount).transpose()?;
    let kcal_target = update.kcal_target.map(finite_amount).transpose()?;
    let profile = current_mut(doc)?;
    if let Some(phase) = update.phase {
        profile.phase = phase;
    }
    if let Some(weight) = weight {
        profile.weight = weight;
    }
    if let Some(kcal) = kcal_target {
        profile.kcal_target = kcal;
    }
    if let Some(mode) = update.macro_mode {
        profile.macro_mode = mode;
    }
    refresh_auto_macros(profile);
    Ok(())
}

/// Sets daily macros directly. Only allowed in manual macro mode.
pub fn set_manual_macros(doc: &mut Document, macros: Macros) -> PlanResult<()> {
    let macros = finite_macros(macros)?;
    let profile = current_mut(doc)?;
    if profile.macro_mode == MacroMode::Auto {
        return Err(PlanError::AutoMacroMode);
    }
    profile.macros = macros;
    Ok(())
}

/// Edits one phase's per-kg factors.
pub fn set_factors(
    doc: &mut Document,
    phase: Phase,
    protein: Option<f64>,
    fat: Option<f64>,
) -> PlanResult<()> {
    let protein = protein.map(finite_amount).transpose()?;
    let fat = fat.map(finite_amount).transpose()?;
    let profile = current_mut(doc)?;
    let factors = profile.factors.for_phase_mut(phase);
    if let Some(protein) = protein {
        factors.protein = protein;
    }
    if let Some(fat) = fat {
        factors.fat = fat;
    }
    refresh_auto_macros(profile);
    Ok(())
}

pub fn reset_factors(doc: &mut Document) -> PlanResult<()> {
    let profile = current_mut(doc)?;
    profile.factors = Factors::default();
    refresh_auto_macros(profile);
    Ok(())
}

/// Changes the number of meals, padding or truncating meals and percentage rows.
pub fn set_meal_count(doc: &mut Document, count: usize) -> PlanResult<()> {
    if count == 0 {
        return Err(PlanError::InvalidMealCount);
    }
    let profile = current_mut(doc)?;
    profile.meals_count = count;
    profile.ensure_meals();
    profile.ensure_percentages();
    Ok(())
}

pub fn set_split_mode(doc: &mut Document, mode: SplitMode) -> PlanResult<()> {
    let profile = current_mut(doc)?;
    profile.split_mode = mode;
    profile.ensure_percentages();
    Ok(())
}

/// Edits one percentage row. Values are clamped to 0-100.
pub fn set_percentage(
    doc: &mut Document,
    row: usize,
    group: MacroGroup,
    percent: u32,
) -> PlanResult<()> {
    let profile = current_mut(doc)?;
    let row = profile
        .percentages
        .get_mut(row)
        .ok_or(PlanError::MealNotFound(row + 1))?;
    row.set(group, percent);
    Ok(())
}

pub fn rename_percentage_row(doc: &mut Document, row: usize, name: &str) -> PlanResult<()> {
    let profile = current_mut(doc)?;
    let row = profile
        .percentages
        .get_mut(row)
        .ok_or(PlanError::MealNotFound(row + 1))?;
    row.name = name.trim().to_string();
    Ok(())
}

pub fn equalize_split(doc: &mut Document) -> PlanResult<()> {
    equalize_percentages(current_mut(doc)?);
    Ok(())
}

/// Applies the percentage split of the current profile to its meals.
pub fn apply_split(doc: &mut Document) -> PlanResult<()> {
    apply_distribution(current_mut(doc)?)
}
