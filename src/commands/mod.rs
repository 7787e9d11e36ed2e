mod config_cmd;
mod export_cmd;
mod food;
mod meal;
mod prefs;
mod profile;
mod split;
mod sync_cmd;
mod variant;

pub use config_cmd::ConfigCommand;
pub use export_cmd::{ExportCommand, ImportCommand};
pub use food::FoodCommand;
pub use meal::{MealCommand, SummaryCommand};
pub use prefs::PrefsCommand;
pub use profile::ProfileCommand;
pub use split::SplitCommand;
pub use sync_cmd::{ResetLocalCommand, SyncCommand};
pub use variant::VariantCommand;

use std::io::{self, Write};

use clap::ValueEnum;

use macroplan::models::{MacroGroup, MacroMode, Phase, SplitMode};
use macroplan::planner::PlanError;

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// Parses a macro group name or letter (c, p, f).
pub fn parse_group(s: &str) -> Result<MacroGroup, String> {
    MacroGroup::parse(s).ok_or_else(|| format!("Invalid macro group '{}'. Use c, p or f", s))
}

pub fn parse_phase(s: &str) -> Result<Phase, String> {
    Phase::parse(s).ok_or_else(|| format!("Invalid phase '{}'. Use bulk or cut", s))
}

pub fn parse_macro_mode(s: &str) -> Result<MacroMode, String> {
    match s.trim().to_lowercase().as_str() {
        "auto" => Ok(MacroMode::Auto),
        "manual" => Ok(MacroMode::Manual),
        _ => Err(format!("Invalid macro mode '{}'. Use auto or manual", s)),
    }
}

pub fn parse_split_mode(s: &str) -> Result<SplitMode, String> {
    match s.trim().to_lowercase().as_str() {
        "percent" | "%" => Ok(SplitMode::Percent),
        "manual" => Ok(SplitMode::Manual),
        _ => Err(format!("Invalid split mode '{}'. Use percent or manual", s)),
    }
}

/// Converts a 1-based meal number from the command line.
pub fn meal_index(number: usize) -> Result<usize, PlanError> {
    number.checked_sub(1).ok_or(PlanError::MealNotFound(number))
}

/// Asks for confirmation on stdin unless `force` is set.
pub fn confirm(prompt: &str, force: bool) -> io::Result<bool> {
    if force {
        return Ok(true);
    }
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}
