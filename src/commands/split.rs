use clap::{Args, Subcommand};

use macroplan::db::LocalStore;
use macroplan::models::{fmt_grams, MacroGroup, Profile, SplitMode};
use macroplan::planner::profiles::{
    apply_split, equalize_split, rename_percentage_row, set_meal_count, set_percentage,
    set_split_mode,
};
use macroplan::planner::{percent_totals, PlanError};
use macroplan::sync::{RemoteStore, SyncEngine};

use super::{meal_index, parse_split_mode};

#[derive(Args)]
pub struct SplitCommand {
    #[command(subcommand)]
    pub command: SplitSubcommand,
}

#[derive(Subcommand)]
pub enum SplitSubcommand {
    /// Show the percentage table and meal targets
    Show,

    /// Set the number of meals
    Meals { count: usize },

    /// Switch between percent and manual split
    Mode {
        #[arg(value_parser = parse_split_mode)]
        mode: SplitMode,
    },

    /// Edit one row of the percentage table
    Set {
        /// Meal number (1-based)
        meal: usize,

        #[arg(long, short = 'c')]
        carbs: Option<u32>,

        #[arg(long, short = 'p')]
        protein: Option<u32>,

        #[arg(long, short = 'f')]
        fat: Option<u32>,

        /// Row label
        #[arg(long)]
        name: Option<String>,
    },

    /// Spread every column evenly across meals
    Equalize,

    /// Apply the percentages to the meal targets
    Apply,
}

fn print_split(profile: &Profile) {
    println!("Split mode: {}", profile.split_mode);
    println!();
    println!(
        "{:<4}{:<20}  {:>5}  {:>5}  {:>5}   {}",
        "#", "ROW", "C%", "P%", "F%", "MEAL TARGET"
    );
    println!("{}", "-".repeat(78));
    for (i, row) in profile.percentages.iter().enumerate() {
        let target = profile
            .meals
            .get(i)
            .map(|meal| {
                format!(
                    "{} ({} kcal)",
                    meal.macros.grams,
                    fmt_grams(meal.macros.kcal)
                )
            })
            .unwrap_or_default();
        println!(
            "{:<4}{:<20}  {:>5}  {:>5}  {:>5}   {}",
            i + 1,
            row.name,
            row.carbs,
            row.protein,
            row.fat,
            target
        );
    }
    let totals = percent_totals(profile);
    println!(
        "{:<24}  {:>5}  {:>5}  {:>5}",
        "Total", totals.carbs, totals.protein, totals.fat
    );
    if profile.split_mode == SplitMode::Percent && !totals.is_balanced() {
        println!("\nWarning: every column must sum to 100% before applying");
    }
}

impl SplitCommand {
    pub async fn run<L: LocalStore, R: RemoteStore>(
        &self,
        engine: &SyncEngine<L, R>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            SplitSubcommand::Show => {}
            SplitSubcommand::Meals { count } => {
                engine.mutate(|doc| set_meal_count(doc, *count)).await?;
            }
            SplitSubcommand::Mode { mode } => {
                engine.mutate(|doc| set_split_mode(doc, *mode)).await?;
            }
            SplitSubcommand::Set {
                meal,
                carbs,
                protein,
                fat,
                name,
            } => {
                if carbs.is_none() && protein.is_none() && fat.is_none() && name.is_none() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }
                let row = meal_index(*meal)?;
                let values = [
                    (MacroGroup::Carbs, *carbs),
                    (MacroGroup::Protein, *protein),
                    (MacroGroup::Fat, *fat),
                ];
                engine
                    .mutate(|doc| {
                        for (group, value) in values {
                            if let Some(percent) = value {
                                set_percentage(doc, row, group, percent)?;
                            }
                        }
                        if let Some(name) = name {
                            rename_percentage_row(doc, row, name)?;
                        }
                        Ok::<_, PlanError>(())
                    })
                    .await?;
            }
            SplitSubcommand::Equalize => {
                engine.mutate(equalize_split).await?;
            }
            SplitSubcommand::Apply => {
                engine.mutate(apply_split).await?;
                println!("Applied split to meal targets");
            }
        }

        let doc = engine.snapshot().await;
        let profile = doc.current_profile().ok_or(PlanError::NoCurrentProfile)?;
        print_split(profile);
        Ok(())
    }
}
