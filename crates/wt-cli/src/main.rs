use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wt_cli::commands::{employee, holiday, leave, status, task, timer};
use wt_cli::{Cli, Commands, Config};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(wt_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = wt_db::Database::open(&config.database_path)
        .with_context(|| format!("failed to open {}", config.database_path.display()))?
        .with_config(config.engine());
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing with verbose flag support
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // Use try_init to avoid panic if tracing is already initialized (e.g., in tests)
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();

    let Some(command) = cli.command else {
        // No subcommand, show help
        use clap::CommandFactory;
        Cli::command().print_help()?;
        println!();
        return Ok(());
    };

    let (mut db, config) = open_database(cli.config.as_deref())?;
    let now = Utc::now();
    let mut stdout = std::io::stdout().lock();

    match command {
        Commands::Status => status::run(&mut stdout, &db, &config.database_path)?,
        Commands::Holiday(action) => holiday::run(&mut stdout, &mut db, action)?,
        Commands::Employee(action) => employee::run(&mut stdout, &mut db, action, now)?,
        Commands::Leave(action) => leave::run(&mut stdout, &mut db, action, now)?,
        Commands::Task(action) => task::run(&mut stdout, &mut db, action, now)?,
        Commands::Timer(action) => timer::run(&mut stdout, &mut db, action, now)?,
    }

    stdout.flush()?;
    Ok(())
}
