use clap::{Args, Subcommand};
use std::path::Path;

use macroplan::config::Config;

use super::OutputFormat;

const DEFAULT_CONFIG: &str = "\
# Path to the local SQLite database (relative paths resolve next to this file)
# database_path: macroplan.db

sync:
  # server_url: \"http://localhost:8080\"
  # api_key: \"your-api-key\"
  auto_sync: false
  debounce_ms: 600
";

#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    pub command: ConfigSubcommand,
}

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Show current configuration values
    Show {
        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Write a commented default config file
    Init {
        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

fn masked(key: &str) -> String {
    format!("{}...", key.chars().take(8).collect::<String>())
}

fn write_default(path: &Path, force: bool) -> Result<bool, std::io::Error> {
    if path.exists() && !force {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, DEFAULT_CONFIG)?;
    Ok(true)
}

impl ConfigCommand {
    pub fn run(
        &self,
        config: &Config,
        config_path: Option<&Path>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        match &self.command {
            ConfigSubcommand::Show { format } => {
                match format {
                    OutputFormat::Json => {
                        let mut value = serde_json::to_value(config)?;
                        if let Some(key) = config.sync.api_key.as_deref() {
                            value["sync"]["api_key"] = masked(key).into();
                        }
                        println!("{}", serde_json::to_string_pretty(&value)?);
                    }
                    OutputFormat::Text => {
                        println!("Configuration");
                        println!("=============\n");

                        if let Some(path) = &config.config_file {
                            println!("Config file: {}", path.display());
                        } else {
                            println!(
                                "Config file: {} (not found)",
                                Config::default_config_path().display()
                            );
                        }
                        println!();

                        println!(
                            "database_path: {}",
                            config.database_path.value.display()
                        );
                        println!("  source: {}", config.database_path.source);
                        println!();

                        let sync = &config.sync;
                        println!(
                            "sync.server_url: {}",
                            sync.server_url.as_deref().unwrap_or("(not set)")
                        );
                        println!(
                            "sync.api_key:    {}",
                            sync.api_key
                                .as_deref()
                                .map(masked)
                                .unwrap_or_else(|| "(not set)".to_string())
                        );
                        println!("sync.auto_sync:  {}", sync.auto_sync);
                        println!("sync.debounce_ms: {}", sync.debounce_ms);
                    }
                }
                Ok(())
            }

            ConfigSubcommand::Init { force } => {
                let path = config_path
                    .map(Path::to_path_buf)
                    .unwrap_or_else(Config::default_config_path);
                if write_default(&path, *force)? {
                    println!("Wrote {}", path.display());
                } else {
                    println!(
                        "{} already exists. Use --force to overwrite.",
                        path.display()
                    );
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_loads() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yaml");
        assert!(write_default(&path, false).unwrap());
        assert!(!write_default(&path, false).unwrap());

        let config = Config::load(Some(path.clone())).unwrap();
        assert_eq!(config.config_file, Some(path));
        assert_eq!(config.sync.debounce_ms, 600);
        assert!(!config.sync.auto_sync);
    }

    #[test]
    fn test_masked_key() {
        assert_eq!(masked("abcdefghijkl"), "abcdefgh...");
        assert_eq!(masked("abc"), "abc...");
    }
}
