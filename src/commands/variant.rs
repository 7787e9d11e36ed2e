use clap::{Args, Subcommand};

use macroplan::db::LocalStore;
use macroplan::planner::meals::{delete_variant, new_variant, rename_variant, switch_variant};
use macroplan::planner::PlanError;
use macroplan::sync::{RemoteStore, SyncEngine};

use super::meal_index;

/// Manage alternative compositions of a meal
#[derive(Args)]
pub struct VariantCommand {
    #[command(subcommand)]
    pub command: VariantSubcommand,
}

#[derive(Subcommand)]
pub enum VariantSubcommand {
    /// List the variants of a meal
    List { meal: usize },

    /// Copy the current items into a new variant and switch to it
    New { meal: usize },

    /// Switch to another variant
    Switch {
        meal: usize,

        /// Variant ID (UUID) or name
        variant: String,
    },

    /// Rename the active variant
    Rename { meal: usize, name: String },

    /// Delete the active variant
    Delete { meal: usize },
}

impl VariantCommand {
    pub async fn run<L: LocalStore, R: RemoteStore>(
        &self,
        engine: &SyncEngine<L, R>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let meal = match &self.command {
            VariantSubcommand::List { meal } => *meal,
            VariantSubcommand::New { meal } => {
                let index = meal_index(*meal)?;
                engine.mutate(|doc| new_variant(doc, index)).await?;
                *meal
            }
            VariantSubcommand::Switch { meal, variant } => {
                let index = meal_index(*meal)?;
                engine
                    .mutate(|doc| switch_variant(doc, index, variant))
                    .await?;
                *meal
            }
            VariantSubcommand::Rename { meal, name } => {
                let index = meal_index(*meal)?;
                engine
                    .mutate(|doc| rename_variant(doc, index, name))
                    .await?;
                *meal
            }
            VariantSubcommand::Delete { meal } => {
                let index = meal_index(*meal)?;
                engine.mutate(|doc| delete_variant(doc, index)).await?;
                *meal
            }
        };

        let index = meal_index(meal)?;
        let doc = engine.snapshot().await;
        let current = doc
            .current_profile()
            .ok_or(PlanError::NoCurrentProfile)?
            .meals
            .get(index)
            .ok_or(PlanError::MealNotFound(meal))?;

        println!("{}. {}", meal, current.name);
        for variant in &current.variants {
            let marker = if current.active_var_id == Some(variant.id) {
                "*"
            } else {
                " "
            };
            println!("  {} {:<36}  {}", marker, variant.id, variant.name);
        }
        Ok(())
    }
}
