//! Sync CLI commands for the remote document store.

use clap::{Args, Subcommand};

use macroplan::config::Config;
use macroplan::db::LocalStore;
use macroplan::sync::{HttpRemote, RemoteError, RemoteStore, SyncEngine, SyncError, SyncStatus};

use super::confirm;

/// Sync with the remote store
#[derive(Debug, Args)]
pub struct SyncCommand {
    #[command(subcommand)]
    command: Option<SyncSubcommand>,

    /// Replace local data with the remote copy
    #[arg(long, conflicts_with = "watch")]
    force_pull: bool,

    /// Keep running and print updates until interrupted
    #[arg(long)]
    watch: bool,
}

#[derive(Debug, Subcommand)]
enum SyncSubcommand {
    /// Show sync configuration and server status
    Status,
}

impl SyncCommand {
    /// `sync status` only inspects configuration and the server.
    pub fn is_status(&self) -> bool {
        matches!(self.command, Some(SyncSubcommand::Status))
    }

    pub async fn run<L: LocalStore, R: RemoteStore>(
        &self,
        engine: &SyncEngine<L, R>,
    ) -> Result<(), SyncError> {
        let user_id = engine.user_id().await.ok_or(SyncError::NoSession)?;

        if self.force_pull {
            engine.force_pull().await?;
            println!("{}", engine.current_status());
            return Ok(());
        }

        println!("User:   {}", user_id);
        println!("Status: {}", engine.current_status());

        if let Some(report) = engine.flush().await? {
            match &report.error {
                None => println!("Pushed {} KB", report.bytes / 1024),
                Some(e) => println!("Push failed: {}", e),
            }
        }

        if self.watch {
            watch(engine).await;
        }
        Ok(())
    }

    pub async fn status(&self, config: &Config) -> Result<(), SyncError> {
        println!("Sync Configuration");
        println!("==================");
        println!();

        if !config.sync.is_configured() {
            println!("Status: Not configured");
            println!();
            println!("To enable sync, add to your config file:");
            println!();
            println!("  sync:");
            println!("    server_url: \"http://localhost:8080\"");
            println!("    api_key: \"your-api-key\"");
            println!("    auto_sync: true");
            println!();
            println!("Or set environment variables:");
            println!("  MACROPLAN_SYNC_URL");
            println!("  MACROPLAN_SYNC_API_KEY");
            return Ok(());
        }

        let remote = HttpRemote::from_config(&config.sync)?;
        let server_url = config.sync.server_url.as_deref().unwrap_or_default();
        let api_key = config.sync.api_key.as_deref().unwrap_or_default();

        println!("Server:    {}", server_url);
        println!(
            "API Key:   {}...",
            api_key.chars().take(8).collect::<String>()
        );
        println!(
            "Auto-sync: {}",
            if config.sync.auto_sync {
                "enabled"
            } else {
                "disabled"
            }
        );
        println!("Debounce:  {} ms", config.sync.debounce_ms);
        println!();

        print!("Server status: ");
        match remote.check_health().await {
            Ok(()) => match remote.identity().await {
                Ok(user_id) => println!("connected as {}", user_id),
                Err(e) => println!("reachable, {}", e),
            },
            Err(RemoteError::Connection(_)) => println!("unreachable"),
            Err(e) => println!("error: {}", e),
        }

        Ok(())
    }
}

/// Prints status changes and remote updates until ctrl-c.
async fn watch<L: LocalStore, R: RemoteStore>(engine: &SyncEngine<L, R>) {
    let mut status = engine.status();
    let mut revisions = engine.revisions();
    println!("Watching for changes (ctrl-c to stop)");

    loop {
        tokio::select! {
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                println!("{}", current);
                if let SyncStatus::Error(_) = current {
                    tracing::warn!("Sync reported an error while watching");
                }
            }
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                let revision = *revisions.borrow_and_update();
                tracing::debug!(revision, "Local document replaced from remote");
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
}

/// Wipe local data and start from a fresh plan
#[derive(Debug, Args)]
pub struct ResetLocalCommand {
    /// Skip confirmation prompt
    #[arg(long, short)]
    force: bool,
}

impl ResetLocalCommand {
    pub async fn run<L: LocalStore, R: RemoteStore>(
        &self,
        engine: &SyncEngine<L, R>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        if !confirm("Delete all local data?", self.force)? {
            println!("Reset cancelled.");
            return Ok(());
        }
        engine.reset_local().await?;
        println!("Local data reset. {}", engine.current_status());
        Ok(())
    }
}
