//! Database and asset synchronization between a local environment and a
//! deployed server.
//!
//! Provides CLI tasks to pull, push and back up data

// dbsync/src/main.rs
mod assets;
mod config;
mod context;
mod database;
mod errors;
mod tasks;
mod utils;

use anyhow::{Context, Result};
use clap::Parser;
use config::{EnvOverrides, Settings};
use context::SyncContext;
use std::path::PathBuf;
use std::process::ExitCode;
use std::str::FromStr;
use tasks::confirm::TerminalConfirmer;
use tasks::{Outcome, Task, TASKS};
use tracing_subscriber::EnvFilter;
use utils::command::SystemRunner;

#[derive(Debug, Parser)]
#[command(name = "dbsync", version, about = "Pull, push and back up databases and assets between local and remote environments")]
struct Cli {
    /// Task to run, e.g. db:pull, assets:push or app:local:sync
    #[arg(required_unless_present = "list")]
    task: Option<String>,

    /// Environment to pull from instead of the configured remote (db:local:sync / db:pull only)
    source: Option<String>,

    /// Path to the JSON configuration file
    #[arg(long, env = "DBSYNC_CONFIG", default_value = "config.json")]
    config: PathBuf,

    /// List available tasks and exit
    #[arg(long)]
    list: bool,

    /// Log every command that is run
    #[arg(short, long)]
    verbose: bool,
}

/// Main entry point for the sync tool
#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list {
        print_tasks();
        return ExitCode::SUCCESS;
    }

    match run_app(&cli).await {
        Ok(Outcome::Completed) => {
            println!("✅ Operation completed successfully.");
            ExitCode::SUCCESS
        }
        Ok(Outcome::Declined) => {
            println!("Aborted.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("❌ Error: {:?}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn print_tasks() {
    let width = TASKS.iter().map(|(name, _)| name.len()).max().unwrap_or(0);
    for (name, description) in TASKS {
        println!("dbsync {:<width$}  # {}", name, description, width = width);
    }
}

async fn run_app(cli: &Cli) -> Result<Outcome> {
    let task_name = cli
        .task
        .as_deref()
        .context("No task given; run with --list to see available tasks")?;
    let task = Task::from_str(task_name)?;

    let settings = Settings::load_from_json(&cli.config, &EnvOverrides::from_env())
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    let runner = SystemRunner;
    let ctx = SyncContext::new(&settings, &runner);
    tasks::run(task, cli.source.as_deref(), &ctx, &TerminalConfirmer::for_stdin())
        .await
        .with_context(|| format!("Task {} failed", task.name()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_parses_task_and_source() {
        let cli = Cli::parse_from(["dbsync", "db:pull", "staging", "--config", "deploy/sync.json"]);
        assert_eq!(cli.task.as_deref(), Some("db:pull"));
        assert_eq!(cli.source.as_deref(), Some("staging"));
        assert_eq!(cli.config, PathBuf::from("deploy/sync.json"));
        assert!(!cli.list);
    }

    #[test]
    fn test_cli_requires_task_unless_listing() {
        assert!(Cli::try_parse_from(["dbsync"]).is_err());
        assert!(Cli::try_parse_from(["dbsync", "--list"]).is_ok());
    }
}
