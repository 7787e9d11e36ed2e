use clap::{Args, Subcommand};

use macroplan::db::LocalStore;
use macroplan::models::{fmt_grams, MacroMode, Macros, Phase, Profile};
use macroplan::planner::profiles::{
    add_profile, delete_current_profile, find_profile, rename_profile, reset_factors,
    select_profile, set_factors, set_manual_macros, set_targets,
};
use macroplan::planner::{PlanError, TargetsUpdate};
use macroplan::sync::{RemoteStore, SyncEngine};

use super::{confirm, parse_macro_mode, parse_phase, OutputFormat};

#[derive(Args)]
pub struct ProfileCommand {
    #[command(subcommand)]
    pub command: ProfileSubcommand,
}

#[derive(Subcommand)]
pub enum ProfileSubcommand {
    /// List profiles
    List,

    /// Show a profile's targets (default: current)
    Show {
        /// Profile ID (UUID) or name
        identifier: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Create a profile and make it current
    Add { name: String },

    /// Rename the current profile
    Rename { name: String },

    /// Delete the current profile
    Delete {
        /// Skip confirmation prompt
        #[arg(long, short)]
        force: bool,
    },

    /// Make a profile current
    Select {
        /// Profile ID (UUID) or name
        identifier: String,
    },

    /// Set phase, weight, kcal target or macro mode
    Targets {
        #[arg(long, value_parser = parse_phase)]
        phase: Option<Phase>,

        /// Body weight in kg
        #[arg(long)]
        weight: Option<f64>,

        #[arg(long)]
        kcal: Option<f64>,

        /// auto or manual
        #[arg(long, value_parser = parse_macro_mode)]
        mode: Option<MacroMode>,
    },

    /// Set daily macros in grams (manual macro mode only)
    Macros {
        #[arg(long, short = 'c')]
        carbs: f64,

        #[arg(long, short = 'p')]
        protein: f64,

        #[arg(long, short = 'f')]
        fat: f64,
    },

    /// Set per-kg protein and fat factors of a phase
    Factors {
        #[arg(value_parser = parse_phase)]
        phase: Phase,

        #[arg(long, short = 'p')]
        protein: Option<f64>,

        #[arg(long, short = 'f')]
        fat: Option<f64>,
    },

    /// Restore the default factors
    ResetFactors,
}

fn print_profile(profile: &Profile) {
    println!("{}", profile.name);
    println!("{}", "=".repeat(profile.name.chars().count()));
    println!("ID:          {}", profile.id);
    println!("Phase:       {}", profile.phase);
    println!("Weight:      {} kg", fmt_grams(profile.weight));
    println!("Kcal target: {}", fmt_grams(profile.kcal_target));
    println!("Macro mode:  {}", profile.macro_mode);
    println!(
        "Daily:       {} ({} kcal)",
        profile.macros,
        fmt_grams(profile.macros.kcal())
    );
    for phase in [Phase::Bulk, Phase::Cut] {
        let factors = profile.factors.for_phase(phase);
        println!(
            "Factors {:<4}: protein {} g/kg, fat {} g/kg",
            phase.to_string(),
            factors.protein,
            factors.fat
        );
    }
    println!(
        "Meals:       {} ({} split)",
        profile.meals_count, profile.split_mode
    );
}

impl ProfileCommand {
    pub async fn run<L: LocalStore, R: RemoteStore>(
        &self,
        engine: &SyncEngine<L, R>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ProfileSubcommand::List => {
                let doc = engine.snapshot().await;
                for profile in &doc.profiles {
                    let marker = if profile.id == doc.current_profile_id {
                        "*"
                    } else {
                        " "
                    };
                    println!("{} {:<36}  {}", marker, profile.id, profile.name);
                }
                Ok(())
            }

            ProfileSubcommand::Show { identifier, format } => {
                let doc = engine.snapshot().await;
                let profile = match identifier {
                    Some(key) => find_profile(&doc, key)
                        .ok_or_else(|| PlanError::ProfileNotFound(key.clone()))?,
                    None => doc.current_profile().ok_or(PlanError::NoCurrentProfile)?,
                };
                match format {
                    OutputFormat::Json => println!("{}", serde_json::to_string_pretty(profile)?),
                    OutputFormat::Text => print_profile(profile),
                }
                Ok(())
            }

            ProfileSubcommand::Add { name } => {
                engine.mutate(|doc| add_profile(doc, name)).await?;
                println!("Created profile '{}' and made it current", name.trim());
                Ok(())
            }

            ProfileSubcommand::Rename { name } => {
                engine.mutate(|doc| rename_profile(doc, name)).await?;
                println!("Renamed current profile to '{}'", name.trim());
                Ok(())
            }

            ProfileSubcommand::Delete { force } => {
                let name = engine
                    .read(|doc| doc.current_profile().map(|p| p.name.clone()))
                    .await
                    .ok_or(PlanError::NoCurrentProfile)?;
                if !confirm(&format!("Delete profile '{}'?", name), *force)? {
                    println!("Deletion cancelled.");
                    return Ok(());
                }
                let removed = engine.mutate(delete_current_profile).await?;
                println!("Deleted profile: {}", removed.name);
                Ok(())
            }

            ProfileSubcommand::Select { identifier } => {
                let id = engine.mutate(|doc| select_profile(doc, identifier)).await?;
                println!("Current profile: {}", id);
                Ok(())
            }

            ProfileSubcommand::Targets {
                phase,
                weight,
                kcal,
                mode,
            } => {
                if phase.is_none() && weight.is_none() && kcal.is_none() && mode.is_none() {
                    return Err("Nothing to update. Provide at least one option.".into());
                }
                let update = TargetsUpdate {
                    phase: *phase,
                    weight: *weight,
                    kcal_target: *kcal,
                    macro_mode: *mode,
                };
                engine.mutate(|doc| set_targets(doc, update)).await?;
                print_current(engine).await
            }

            ProfileSubcommand::Macros {
                carbs,
                protein,
                fat,
            } => {
                let macros = Macros::new(*carbs, *protein, *fat);
                engine.mutate(|doc| set_manual_macros(doc, macros)).await?;
                print_current(engine).await
            }

            ProfileSubcommand::Factors {
                phase,
                protein,
                fat,
            } => {
                engine
                    .mutate(|doc| set_factors(doc, *phase, *protein, *fat))
                    .await?;
                print_current(engine).await
            }

            ProfileSubcommand::ResetFactors => {
                engine.mutate(reset_factors).await?;
                print_current(engine).await
            }
        }
    }
}

async fn print_current<L: LocalStore, R: RemoteStore>(
    engine: &SyncEngine<L, R>,
) -> Result<(), Box<dyn std::error::Error>> {
    let doc = engine.snapshot().await;
    let profile = doc.current_profile().ok_or(PlanError::NoCurrentProfile)?;
    print_profile(profile);
    Ok(())
}
