//! CLI parser and config loading.

use std::env;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use uuid::Uuid;
use whatevers_storage::StorageConfig;

#[derive(Parser, Debug)]
#[command(name = "whatevers")]
#[command(about = "Manage whatevers stored in SQLite", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Overrides DATABASE_URL.
    #[arg(long, global = true)]
    pub database_url: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Commands {
    /// Store a new whatever; skipped when the id is already taken.
    Insert {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        description: Option<String>,
        /// Use this id instead of generating one.
        #[arg(long)]
        id: Option<Uuid>,
    },
    /// Print one whatever as JSON (null when absent).
    Get { id: Uuid },
    /// Check whether an id is stored.
    Exists { id: Uuid },
    /// List whatevers in insertion order.
    List {
        /// Only whatevers with exactly this name.
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        limit: Option<i64>,
        #[arg(long)]
        offset: Option<i64>,
    },
    /// Change name and/or description; skipped when the id is not stored.
    Update {
        id: Uuid,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Delete a whatever; fails when the id is not stored.
    Delete { id: Uuid },
}

/// Runtime config: storage settings plus the optional log file (LOG_FILE).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub storage: StorageConfig,
    pub log_file: Option<String>,
}

/// Loads config from the environment. `database_url` overrides DATABASE_URL.
pub fn load_config(database_url: Option<String>) -> Result<AppConfig> {
    let mut storage = StorageConfig::from_env().context("Load storage config from env")?;
    if let Some(url) = database_url {
        storage.database_url = url;
    }
    let log_file = env::var("LOG_FILE").ok().filter(|p| !p.trim().is_empty());

    Ok(AppConfig { storage, log_file })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_insert() {
        let cli = Cli::try_parse_from([
            "whatevers",
            "insert",
            "--name",
            "widget",
            "-d",
            "blue",
        ])
        .unwrap();

        assert!(cli.database_url.is_none());
        assert_eq!(
            cli.command,
            Commands::Insert {
                name: "widget".to_string(),
                description: Some("blue".to_string()),
                id: None,
            }
        );
    }

    #[test]
    fn test_global_database_url_after_subcommand() {
        let id = Uuid::new_v4();
        let cli = Cli::try_parse_from([
            "whatevers",
            "get",
            &id.to_string(),
            "--database-url",
            "sqlite::memory:",
        ])
        .unwrap();

        assert_eq!(cli.database_url.as_deref(), Some("sqlite::memory:"));
        assert_eq!(cli.command, Commands::Get { id });
    }

    #[test]
    fn test_invalid_uuid_rejected() {
        assert!(Cli::try_parse_from(["whatevers", "delete", "not-a-uuid"]).is_err());
    }

    #[test]
    fn test_load_config_override() {
        let config = load_config(Some("sqlite::memory:".to_string())).unwrap();
        assert!(config.storage.is_in_memory());
    }
}
