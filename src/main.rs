mod api;
mod backup;
mod cli;
mod config;
mod db;
mod error;
mod schedule;
mod tracker;

use crate::cli::{Cli, Commands, ConfigCommands};
use crate::config::Config;
use crate::schedule::ScheduleBook;
use crate::schedule::export::export_schedules;
use crate::tracker::sync::{SyncReport, sync_schedules};
use anyhow::{Context, Result, bail};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::Notify;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve { no_browser: false }) {
        Commands::Serve { no_browser } => handle_serve(no_browser).await,
        Commands::Sync => handle_sync(),
        Commands::Pick { limit, schedule } => handle_pick(limit, schedule),
        Commands::Watch { title, schedule } => handle_watch(&title, schedule),
        Commands::Status { schedule } => handle_status(schedule),
        Commands::List { schedule } => handle_list(schedule),
        Commands::Export { overwrite } => handle_export(overwrite),
        Commands::Backup => handle_backup(),
        Commands::Config { command } => handle_config_command(command),
    }
}

async fn handle_serve(no_browser: bool) -> Result<()> {
    let mut config = load_or_default_config()?;
    if no_browser {
        config.open_browser = false;
    }

    info!("initializing database");
    run_sync(&config)?;
    info!("database ready");

    let shutdown = Arc::new(Notify::new());
    let signal_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_shutdown.notify_one();
        }
    });

    api::run_server(Arc::new(config), shutdown).await
}

fn handle_sync() -> Result<()> {
    let config = load_or_default_config()?;
    let report = run_sync(&config)?;

    for entry in &report.schedules {
        if entry.created {
            println!("Created table '{}' ({} films)", entry.name, entry.added.len());
            continue;
        }
        if !entry.added.is_empty() {
            println!(
                "Added {} films to {}: {}",
                entry.added.len(),
                entry.name,
                entry.added.join(", ")
            );
        }
        if !entry.removed.is_empty() {
            println!(
                "Removed {} films from {}: {}",
                entry.removed.len(),
                entry.name,
                entry.removed.join(", ")
            );
        }
    }
    for table in &report.dropped {
        println!("Dropped table '{table}'");
    }
    for warning in &report.duplicates {
        println!(
            "[WARN] Found {} duplicates in '{}'",
            warning.duplicates, warning.table
        );
    }
    for failure in &report.failures {
        println!("[FAIL] {}: {}", failure.target, failure.error);
    }

    if report.duplicates.is_empty() && report.failures.is_empty() {
        println!("All tables are clean - no duplicates found");
    }

    Ok(())
}

fn handle_pick(limit: Option<usize>, schedule: Option<String>) -> Result<()> {
    let config = load_or_default_config()?;
    let schedule = schedule.unwrap_or_else(|| config.active_schedule.clone());
    let limit = limit.unwrap_or(config.pick_limit);

    let films = tracker::pick(&config.db_path, &schedule, limit)?;
    if films.is_empty() {
        println!("Nothing left to watch in {schedule}");
    }
    for film in films {
        println!("{}: {}", film.title, film.appearances);
    }

    Ok(())
}

fn handle_watch(title: &str, schedule: Option<String>) -> Result<()> {
    let config = load_or_default_config()?;
    let schedule = schedule.unwrap_or_else(|| config.active_schedule.clone());

    match tracker::mark_watched(&config.db_path, &schedule, title)? {
        0 => println!("No film titled \"{title}\" in {schedule}"),
        _ => println!("Marked \"{title}\" as watched in {schedule}"),
    }

    Ok(())
}

fn handle_status(schedule: Option<String>) -> Result<()> {
    let config = load_or_default_config()?;
    let schedule = schedule.unwrap_or_else(|| config.active_schedule.clone());
    let counts = tracker::counts(&config.db_path, &schedule)?;

    println!("Film Tracker status");
    println!("- schedule: {schedule}");
    println!("- db_path: {}", config.db_path.display());
    println!("- watched: {}/{}", counts.total - counts.unwatched, counts.total);
    println!("- unwatched: {}", counts.unwatched);

    Ok(())
}

fn handle_list(schedule: Option<String>) -> Result<()> {
    let config = load_or_default_config()?;
    let schedule = schedule.unwrap_or_else(|| config.active_schedule.clone());

    for film in tracker::films(&config.db_path, &schedule)? {
        let mark = if film.watched { "x" } else { " " };
        println!("[{mark}] {} (shown {}x)", film.title, film.appearances);
    }

    Ok(())
}

fn handle_export(overwrite: bool) -> Result<()> {
    let config = load_or_default_config()?;
    let book = load_schedules(&config)?;
    let summary = export_schedules(&book.schedules, &config.csv_dir, overwrite)?;

    for path in &summary.written {
        println!("Exported: {}", path.display());
    }
    for path in &summary.skipped {
        println!("Skipped (exists, use --overwrite): {}", path.display());
    }

    Ok(())
}

fn handle_backup() -> Result<()> {
    let config = load_or_default_config()?;
    let target = backup::backup_database(&config.db_path, &config.backup_dir)?;

    println!("Backup written: {}", target.display());
    Ok(())
}

fn handle_config_command(command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Set { key, value } => {
            let mut config = load_or_default_config()?;
            config.set_value(&key, &value)?;
            config.ensure_bootstrap_files()?;
            config.save()?;

            println!("Config saved: {key} = {value}");
            Ok(())
        }
        ConfigCommands::Get { key } => {
            let config = load_or_default_config()?;
            let value = config
                .get_value(&key)
                .with_context(|| format!("Unsupported config key: {key}"))?;

            println!("{value}");
            Ok(())
        }
    }
}

fn run_sync(config: &Config) -> Result<SyncReport> {
    let book = load_schedules(config)?;
    if book.schedules.is_empty() {
        bail!(
            "No schedules defined in {}",
            config.schedules_path.display()
        );
    }

    if book.get(&config.active_schedule).is_none() {
        warn!(
            schedule = %config.active_schedule,
            "active schedule is not defined in the schedules file"
        );
    }

    let report = sync_schedules(&config.db_path, &book.schedules)
        .with_context(|| format!("Failed to sync database: {}", config.db_path.display()))?;

    info!(
        schedules = report.schedules.len(),
        added = report.total_added(),
        removed = report.total_removed(),
        dropped = report.dropped.len(),
        failures = report.failures.len(),
        "schedule sync finished"
    );

    Ok(report)
}

fn load_schedules(config: &Config) -> Result<ScheduleBook> {
    config.ensure_bootstrap_files()?;
    ScheduleBook::load(&config.schedules_path)
}

fn load_or_default_config() -> Result<Config> {
    let config = Config::load_or_init(&Config::config_path())?;
    config.ensure_bootstrap_files()?;
    Ok(config)
}
