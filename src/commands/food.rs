use clap::{Args, Subcommand};
use std::path::PathBuf;

use macroplan::db::LocalStore;
use macroplan::export::foods_json;
use macroplan::models::fmt_grams;
use macroplan::planner::foods::{
    create_food, delete_food, edit_food, import_foods, parse_foods, search_foods,
};
use macroplan::planner::{FoodFormat, FoodInput, ImportError, PlanError};
use macroplan::sync::{RemoteStore, SyncEngine};

use super::{confirm, OutputFormat};

#[derive(Args)]
pub struct FoodCommand {
    #[command(subcommand)]
    pub command: FoodSubcommand,
}

#[derive(Subcommand)]
pub enum FoodSubcommand {
    /// List foods
    List {
        /// Only foods whose name contains this text
        #[arg(long, short)]
        search: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Add a food (amounts per 100 g)
    Add {
        name: String,

        #[arg(long, default_value = "0")]
        kcal: String,

        #[arg(long, short = 'c', default_value = "0")]
        carbs: String,

        #[arg(long, short = 'p', default_value = "0")]
        protein: String,

        #[arg(long, short = 'f', default_value = "0")]
        fat: String,
    },

    /// Edit a food
    Edit {
        /// Food ID (UUID) or name
        identifier: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        kcal: Option<String>,

        #[arg(long, short = 'c')]
        carbs: Option<String>,

        #[arg(long, short = 'p')]
        protein: Option<String>,

        #[arg(long, short = 'f')]
        fat: Option<String>,
    },

    /// Delete a food and every item that uses it
    Delete {
        /// Food ID (UUID) or name
        identifier: String,

        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Import foods from a JSON or CSV file
    Import {
        path: PathBuf,
    },

    /// Export all foods as JSON
    Export {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

impl FoodCommand {
    pub async fn run<L: LocalStore, R: RemoteStore>(
        &self,
        engine: &SyncEngine<L, R>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            FoodSubcommand::List { search, format } => {
                let doc = engine.snapshot().await;
                let foods: Vec<_> = match search {
                    Some(query) => search_foods(&doc, query),
                    None => doc.foods.iter().collect(),
                };

                if foods.is_empty() {
                    println!("No foods found");
                    return Ok(());
                }

                match format {
                    OutputFormat::Json => {
                        println!("{}", serde_json::to_string_pretty(&foods)?);
                    }
                    OutputFormat::Text => {
                        println!(
                            "{:<30}  {:<7}  {:>7}  {:>6}  {:>6}  {:>6}",
                            "NAME", "GROUP", "KCAL", "C", "P", "F"
                        );
                        println!("{}", "-".repeat(72));
                        for food in &foods {
                            let name = if food.name.chars().count() > 30 {
                                format!("{}...", food.name.chars().take(27).collect::<String>())
                            } else {
                                food.name.clone()
                            };
                            println!(
                                "{:<30}  {:<7}  {:>7}  {:>6}  {:>6}  {:>6}",
                                name,
                                food.group,
                                fmt_grams(food.kcal),
                                fmt_grams(food.carbs),
                                fmt_grams(food.protein),
                                fmt_grams(food.fat)
                            );
                        }
                        println!("\nTotal: {} food(s)", foods.len());
                    }
                }
                Ok(())
            }

            FoodSubcommand::Add {
                name,
                kcal,
                carbs,
                protein,
                fat,
            } => {
                let input = FoodInput::parse(name, kcal, carbs, protein, fat);
                let id = engine.mutate(|doc| create_food(doc, &input)).await?;
                let doc = engine.snapshot().await;
                if let Some(food) = doc.food(id) {
                    println!("Created food:");
                    println!("  {}", food);
                }
                Ok(())
            }

            FoodSubcommand::Edit {
                identifier,
                name,
                kcal,
                carbs,
                protein,
                fat,
            } => {
                let has_updates = name.is_some()
                    || kcal.is_some()
                    || carbs.is_some()
                    || protein.is_some()
                    || fat.is_some();
                if !has_updates {
                    return Err("Nothing to update. Provide at least one option.".into());
                }

                let current = engine
                    .read(|doc| doc.find_food(identifier).cloned())
                    .await
                    .ok_or_else(|| PlanError::FoodNotFound(identifier.clone()))?;

                let amount = |value: &Option<String>, old: f64| {
                    value
                        .as_deref()
                        .map(macroplan::models::parse_amount)
                        .unwrap_or(old)
                };
                let input = FoodInput::new(
                    name.clone().unwrap_or_else(|| current.name.clone()),
                    amount(kcal, current.kcal),
                    amount(carbs, current.carbs),
                    amount(protein, current.protein),
                    amount(fat, current.fat),
                );
                let key = current.id.to_string();
                engine.mutate(|doc| edit_food(doc, &key, &input)).await?;

                let doc = engine.snapshot().await;
                if let Some(food) = doc.food(current.id) {
                    println!("Updated food:");
                    println!("  {}", food);
                }
                Ok(())
            }

            FoodSubcommand::Delete { identifier, force } => {
                let food = engine
                    .read(|doc| doc.find_food(identifier).cloned())
                    .await
                    .ok_or_else(|| PlanError::FoodNotFound(identifier.clone()))?;

                if !confirm(
                    &format!("Delete food '{}' and every item using it?", food.name),
                    *force,
                )? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }

                let key = food.id.to_string();
                let removed = engine.mutate(|doc| delete_food(doc, &key)).await?;
                println!("Deleted food: {}", removed.name);
                Ok(())
            }

            FoodSubcommand::Import { path } => {
                let format = FoodFormat::from_path(path)?;
                let text = std::fs::read_to_string(path)?;
                let inputs = parse_foods(format, &text)?;
                let summary = engine
                    .mutate(|doc| Ok::<_, ImportError>(import_foods(doc, &inputs)))
                    .await?;
                println!(
                    "Imported foods: {} created, {} updated, {} skipped",
                    summary.created, summary.updated, summary.skipped
                );
                Ok(())
            }

            FoodSubcommand::Export { output } => {
                let json = engine.read(foods_json).await?;
                match output {
                    Some(path) => {
                        std::fs::write(path, json)?;
                        println!("Wrote foods to {}", path.display());
                    }
                    None => println!("{}", json),
                }
                Ok(())
            }
        }
    }
}
