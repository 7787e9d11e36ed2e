use clap::{Args, Subcommand};
use std::path::PathBuf;

use macroplan::db::LocalStore;
use macroplan::export::{import_bundle, plan_sheet, Bundle};
use macroplan::sync::{RemoteStore, SyncEngine};

use super::confirm;

#[derive(Args)]
pub struct ExportCommand {
    #[command(subcommand)]
    pub command: ExportSubcommand,
}

#[derive(Subcommand)]
pub enum ExportSubcommand {
    /// Export profiles, foods and preferences as a JSON bundle
    Bundle {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },

    /// Print the current profile's plan as a sheet
    Print,
}

impl ExportCommand {
    pub async fn run<L: LocalStore, R: RemoteStore>(
        &self,
        engine: &SyncEngine<L, R>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ExportSubcommand::Bundle { output } => {
                let json = engine
                    .read(|doc| Bundle::from_document(doc).to_json())
                    .await?;
                match output {
                    Some(path) => {
                        std::fs::write(path, json)?;
                        println!("Wrote bundle to {}", path.display());
                    }
                    None => println!("{}", json),
                }
            }
            ExportSubcommand::Print => {
                let sheet = engine.read(|doc| plan_sheet(doc).to_string()).await;
                println!("{}", sheet.trim_end());
            }
        }
        Ok(())
    }
}

/// Replace profiles and merge foods from an exported bundle
#[derive(Args)]
pub struct ImportCommand {
    path: PathBuf,

    /// Skip confirmation prompt
    #[arg(long, short)]
    force: bool,
}

impl ImportCommand {
    pub async fn run<L: LocalStore, R: RemoteStore>(
        &self,
        engine: &SyncEngine<L, R>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let text = std::fs::read_to_string(&self.path)?;
        if !confirm("A full bundle replaces every profile. Continue?", self.force)? {
            println!("Import cancelled.");
            return Ok(());
        }

        let report = engine.mutate(|doc| import_bundle(doc, &text)).await?;
        println!(
            "Imported {} profile(s); foods: {} created, {} updated, {} skipped",
            report.profiles, report.foods.created, report.foods.updated, report.foods.skipped
        );
        if report.dropped_items > 0 {
            println!(
                "Dropped {} item(s) referring to unknown foods",
                report.dropped_items
            );
        }
        Ok(())
    }
}
