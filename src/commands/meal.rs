use clap::{Args, Subcommand};

use macroplan::db::LocalStore;
use macroplan::models::{fmt_grams, ApproxDirection, Document, MacroGroup, Macros, Meal};
use macroplan::planner::meals::{
    add_item, auto_fill_group, auto_fill_item, remove_item, rename_meal, set_item_grams,
    set_meal_target,
};
use macroplan::planner::{daily_summary, group_totals, item_energy, GridRound, PlanError};
use macroplan::sync::{RemoteStore, SyncEngine};

use super::{meal_index, parse_group, OutputFormat};

#[derive(Args)]
pub struct MealCommand {
    #[command(subcommand)]
    pub command: MealSubcommand,
}

#[derive(Subcommand)]
pub enum MealSubcommand {
    /// Show meals of the current profile
    Show {
        /// Meal number (1-based); all meals when omitted
        meal: Option<usize>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Rename a meal
    Rename { meal: usize, name: String },

    /// Set a meal's macro target in grams (manual split mode only)
    Target {
        meal: usize,

        #[arg(long, short = 'c')]
        carbs: f64,

        #[arg(long, short = 'p')]
        protein: f64,

        #[arg(long, short = 'f')]
        fat: f64,
    },

    /// Add a food to a macro group of a meal
    Add {
        meal: usize,

        /// Macro group (c, p or f)
        #[arg(value_parser = parse_group)]
        group: MacroGroup,

        /// Food ID (UUID) or name
        food: String,
    },

    /// Remove a food from a macro group of a meal
    Remove {
        meal: usize,

        #[arg(value_parser = parse_group)]
        group: MacroGroup,

        food: String,
    },

    /// Set an item's grams by hand
    Grams {
        meal: usize,

        #[arg(value_parser = parse_group)]
        group: MacroGroup,

        food: String,

        grams: f64,
    },

    /// Size an item so it covers the group's target
    Auto {
        meal: usize,

        #[arg(value_parser = parse_group)]
        group: MacroGroup,

        /// Food to size; the group's only item when omitted
        food: Option<String>,
    },
}

/// Print the daily totals against the profile targets
#[derive(Args)]
pub struct SummaryCommand {
    /// Output format
    #[arg(long, short, value_enum, default_value = "text")]
    format: OutputFormat,
}

fn approx_marker(direction: Option<ApproxDirection>) -> &'static str {
    match direction {
        Some(ApproxDirection::Up) => " (rounded up)",
        Some(ApproxDirection::Down) => " (rounded down)",
        None => "",
    }
}

fn print_meal(doc: &Document, number: usize, meal: &Meal) {
    let variant = meal
        .active_variant()
        .map(|v| v.name.as_str())
        .unwrap_or("-");
    println!("{}. {}  [{}]", number, meal.name, variant);
    println!(
        "   Target: {} ({} kcal)",
        meal.macros.grams,
        fmt_grams(meal.macros.kcal)
    );

    if meal.items.is_empty() {
        println!("   (no items)");
    }
    for group in MacroGroup::ALL {
        let items = meal.items.group(group);
        if items.is_empty() {
            continue;
        }
        println!("   {}:", group);
        for item in items {
            match doc.food(item.food_id) {
                Some(food) => println!(
                    "     {:<28} {:>6} g  {:>6} kcal{}{}",
                    food.name,
                    fmt_grams(item.grams),
                    fmt_grams(item_energy(item, food)),
                    if item.auto { " auto" } else { "" },
                    approx_marker(item.approx_dir)
                ),
                None => println!("     (missing food {})", item.food_id),
            }
        }
    }

    let actual = group_totals(&meal.items, &doc.foods);
    println!(
        "   Actual: {} ({} kcal)",
        actual.grams,
        fmt_grams(actual.kcal)
    );
}

fn print_rounding(food: &str, rounded: GridRound) {
    println!(
        "Set {} to {} g{}",
        food,
        fmt_grams(rounded.grams),
        approx_marker(Some(rounded.direction))
    );
}

impl MealCommand {
    pub async fn run<L: LocalStore, R: RemoteStore>(
        &self,
        engine: &SyncEngine<L, R>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            MealSubcommand::Show { meal, format } => {
                let doc = engine.snapshot().await;
                let profile = doc.current_profile().ok_or(PlanError::NoCurrentProfile)?;
                let selected: Vec<(usize, &Meal)> = match meal {
                    Some(number) => {
                        let index = meal_index(*number)?;
                        let meal = profile
                            .meals
                            .get(index)
                            .ok_or(PlanError::MealNotFound(*number))?;
                        vec![(*number, meal)]
                    }
                    None => profile.meals.iter().enumerate().map(|(i, m)| (i + 1, m)).collect(),
                };

                match format {
                    OutputFormat::Json => {
                        let meals: Vec<&Meal> = selected.iter().map(|(_, m)| *m).collect();
                        println!("{}", serde_json::to_string_pretty(&meals)?);
                    }
                    OutputFormat::Text => {
                        for (i, (number, meal)) in selected.iter().enumerate() {
                            if i > 0 {
                                println!();
                            }
                            print_meal(&doc, *number, meal);
                        }
                    }
                }
                Ok(())
            }

            MealSubcommand::Rename { meal, name } => {
                let index = meal_index(*meal)?;
                engine.mutate(|doc| rename_meal(doc, index, name)).await?;
                println!("Renamed meal {} to '{}'", meal, name.trim());
                Ok(())
            }

            MealSubcommand::Target {
                meal,
                carbs,
                protein,
                fat,
            } => {
                let index = meal_index(*meal)?;
                let grams = Macros::new(*carbs, *protein, *fat);
                engine
                    .mutate(|doc| set_meal_target(doc, index, grams))
                    .await?;
                println!("Meal {} target: {}", meal, grams);
                Ok(())
            }

            MealSubcommand::Add { meal, group, food } => {
                let index = meal_index(*meal)?;
                let id = engine
                    .mutate(|doc| add_item(doc, index, *group, food))
                    .await?;
                let name = engine
                    .read(|doc| doc.food(id).map(|f| f.name.clone()))
                    .await
                    .unwrap_or_else(|| food.clone());
                println!("Added {} to {} of meal {}", name, group, meal);
                Ok(())
            }

            MealSubcommand::Remove { meal, group, food } => {
                let index = meal_index(*meal)?;
                engine
                    .mutate(|doc| remove_item(doc, index, *group, food))
                    .await?;
                println!("Removed {} from {} of meal {}", food, group, meal);
                Ok(())
            }

            MealSubcommand::Grams {
                meal,
                group,
                food,
                grams,
            } => {
                let index = meal_index(*meal)?;
                let item = engine
                    .mutate(|doc| set_item_grams(doc, index, *group, food, *grams))
                    .await?;
                println!(
                    "Set {} to {} g{}",
                    food,
                    fmt_grams(item.grams),
                    approx_marker(item.approx_dir)
                );
                Ok(())
            }

            MealSubcommand::Auto { meal, group, food } => {
                let index = meal_index(*meal)?;
                let rounded = match food {
                    Some(food) => {
                        engine
                            .mutate(|doc| auto_fill_item(doc, index, *group, food))
                            .await?
                    }
                    None => {
                        engine
                            .mutate(|doc| auto_fill_group(doc, index, *group))
                            .await?
                    }
                };
                let label = food.clone().unwrap_or_else(|| group.to_string());
                print_rounding(&label, rounded);
                Ok(())
            }
        }
    }
}

impl SummaryCommand {
    pub async fn run<L: LocalStore, R: RemoteStore>(
        &self,
        engine: &SyncEngine<L, R>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let doc = engine.snapshot().await;
        let profile = doc.current_profile().ok_or(PlanError::NoCurrentProfile)?;
        let summary = daily_summary(profile, &doc.foods);

        match self.format {
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "profile": profile.name,
                    "daily": summary.daily.grams,
                    "planned": summary.totals.grams,
                    "aligned": summary.is_aligned(),
                    "warnings": summary.warnings(),
                });
                println!("{}", serde_json::to_string_pretty(&value)?);
            }
            OutputFormat::Text => {
                println!("{}", profile.name);
                println!();
                println!("{}", summary);
            }
        }
        Ok(())
    }
}
