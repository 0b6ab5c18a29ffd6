//! projsync CLI - Mirror local files and folders to a remote project
//!
//! Provides commands for:
//! - Storing the session used for remote calls
//! - Listing and selecting projects
//! - Editing the Sync Tree of the selected project
//! - Running the sync loop
//! - Inspecting configuration

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use projsync_core::config::Config;
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    auth::AuthCommand, config::ConfigCommand, items::ItemsCommand, projects::ProjectsCommand,
    sync::SyncCommand, CliContext,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "projsync",
    version,
    about = "Keep local files mirrored to a remote project's documents"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Manage the stored session
    #[command(subcommand)]
    Auth(AuthCommand),
    /// List and select projects
    #[command(subcommand)]
    Projects(ProjectsCommand),
    /// Edit the files and folders to sync
    #[command(subcommand)]
    Items(ItemsCommand),
    /// Watch the sync tree and mirror changes
    Sync(SyncCommand),
    /// View and check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

/// Log filter from the configured level, raised by `-v`
fn log_filter(configured: &str, verbose: u8) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Loads the configuration; an explicitly named file must exist and parse
fn load_config(explicit: Option<&PathBuf>) -> Result<(Config, PathBuf)> {
    match explicit {
        Some(path) => {
            let config = Config::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?;
            Ok((config, path.clone()))
        }
        None => {
            let path = Config::default_path();
            Ok((Config::load_or_default(&path), path))
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (config, config_path) = load_config(cli.config.as_ref())?;

    let filter = log_filter(&config.logging.level, cli.verbose);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = CliContext {
        format: if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Human
        },
        config,
        config_path,
    };

    match cli.command {
        Commands::Auth(cmd) => cmd.execute(&ctx).await,
        Commands::Projects(cmd) => cmd.execute(&ctx).await,
        Commands::Items(cmd) => cmd.execute(&ctx).await,
        Commands::Sync(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["projsync", "items", "list", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Items(ItemsCommand::List)));
    }

    #[test]
    fn test_items_add_requires_paths() {
        assert!(Cli::try_parse_from(["projsync", "items", "add"]).is_err());
        let cli = Cli::try_parse_from(["projsync", "items", "add", "a", "b"]).unwrap();
        match cli.command {
            Commands::Items(ItemsCommand::Add { paths }) => assert_eq!(paths.len(), 2),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_auth_set_arguments() {
        let cli = Cli::try_parse_from([
            "projsync",
            "auth",
            "set",
            "--organization",
            "7d1c5a0e-9b1e-4c61-8b41-5f6f2f1f0a11",
            "--session-key",
            "sk",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Auth(AuthCommand::Set { verify: false, .. })
        ));
    }

    #[test]
    fn test_log_filter_levels() {
        assert_eq!(log_filter("warn", 0), "warn");
        assert_eq!(log_filter("warn", 1), "debug");
        assert_eq!(log_filter("warn", 3), "trace");
    }

    #[test]
    fn test_explicit_config_must_exist() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.yaml");
        assert!(load_config(Some(&missing)).is_err());

        let present = dir.path().join("config.yaml");
        std::fs::write(&present, "sync:\n  max_file_size_bytes: 2048\n").unwrap();
        let (config, path) = load_config(Some(&present)).unwrap();
        assert_eq!(config.sync.max_file_size_bytes, 2048);
        assert_eq!(path, present);
    }
}
