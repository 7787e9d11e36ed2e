use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

use commands::{
    ConfigCommand, ExportCommand, FoodCommand, ImportCommand, MealCommand, PrefsCommand,
    ProfileCommand, ResetLocalCommand, SplitCommand, SummaryCommand, SyncCommand, VariantCommand,
};
use macroplan::config::Config;
use macroplan::db::{init_db, LocalStore, SqliteStore};
use macroplan::sync::{HttpRemote, MemoryRemote, RemoteError, RemoteStore, SyncEngine, SyncError};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "macroplan")]
#[command(version)]
#[command(about = "A macro-nutrient meal planner", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the food list
    Food(FoodCommand),

    /// Manage profiles and daily targets
    Profile(ProfileCommand),

    /// Split daily targets across meals
    Split(SplitCommand),

    /// Compose meals from foods
    Meal(MealCommand),

    /// Manage meal variants
    Variant(VariantCommand),

    /// Daily totals against the targets
    Summary(SummaryCommand),

    /// Preferences stored with the plan
    Prefs(PrefsCommand),

    /// Export data or print the plan
    Export(ExportCommand),

    /// Import an exported bundle
    Import(ImportCommand),

    /// Sync with the remote store
    Sync(SyncCommand),

    /// Wipe local data
    ResetLocal(ResetLocalCommand),

    /// Manage configuration
    Config(ConfigCommand),
}

impl Commands {
    fn is_sync(&self) -> bool {
        matches!(self, Commands::Sync(_))
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "macroplan=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = Config::load(cli.config.clone())?;

    let Some(command) = cli.command else {
        println!("Use --help to see available commands");
        return Ok(());
    };

    match &command {
        Commands::Config(cmd) => return cmd.run(&config, cli.config.as_deref()),
        Commands::Sync(cmd) if cmd.is_status() => return Ok(cmd.status(&config).await?),
        _ => {}
    }

    let pool = init_db(&config.database_path.value).await?;
    let local = SqliteStore::new(pool);
    let settings = config.sync.settings();

    if config.sync.is_configured() {
        let remote = HttpRemote::from_config(&config.sync)?;
        let engine = SyncEngine::open(local, remote.clone(), settings).await?;
        if config.sync.auto_sync || command.is_sync() {
            connect(&engine, &remote, command.is_sync()).await?;
        }
        execute(&command, &engine).await?;
        finish(&engine).await;
    } else {
        if command.is_sync() {
            return Err(RemoteError::NotConfigured.into());
        }
        let engine = SyncEngine::open(local, MemoryRemote::new(), settings).await?;
        execute(&command, &engine).await?;
    }

    Ok(())
}

/// Starts a sync session for the API key's user. Failures are fatal only for
/// the sync command itself; other commands fall back to local storage.
async fn connect<L: LocalStore>(
    engine: &SyncEngine<L, HttpRemote>,
    remote: &HttpRemote,
    required: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = match remote.identity().await {
        Ok(user_id) => engine.on_session_changed(Some(user_id)).await,
        Err(e) => Err(SyncError::from(e)),
    };
    match session {
        Ok(()) => Ok(()),
        Err(e) if required => Err(e.into()),
        Err(e) => {
            tracing::warn!(error = %e, "Sync unavailable, continuing with local data");
            eprintln!("Warning: sync unavailable ({}); using local data", e);
            engine.on_session_changed(None).await?;
            Ok(())
        }
    }
}

/// Pushes whatever the command left pending before the process exits.
async fn finish<L: LocalStore, R: RemoteStore>(engine: &SyncEngine<L, R>) {
    match engine.flush().await {
        Ok(Some(report)) if !report.ok() => {
            eprintln!(
                "Warning: changes saved locally but not synced: {}",
                report.error.unwrap_or_default()
            );
        }
        Ok(_) => {}
        Err(e) => eprintln!("Warning: changes saved locally but not synced: {}", e),
    }
    engine.end_session().await;
}

async fn execute<L: LocalStore, R: RemoteStore>(
    command: &Commands,
    engine: &SyncEngine<L, R>,
) -> Result<(), Box<dyn std::error::Error>> {
    match command {
        Commands::Food(cmd) => cmd.run(engine).await,
        Commands::Profile(cmd) => cmd.run(engine).await,
        Commands::Split(cmd) => cmd.run(engine).await,
        Commands::Meal(cmd) => cmd.run(engine).await,
        Commands::Variant(cmd) => cmd.run(engine).await,
        Commands::Summary(cmd) => cmd.run(engine).await,
        Commands::Prefs(cmd) => cmd.run(engine).await,
        Commands::Export(cmd) => cmd.run(engine).await,
        Commands::Import(cmd) => cmd.run(engine).await,
        Commands::Sync(cmd) => Ok(cmd.run(engine).await?),
        Commands::ResetLocal(cmd) => cmd.run(engine).await,
        Commands::Config(_) => Ok(()),
    }
}
