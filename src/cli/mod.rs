use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "film-tracker",
    about = "Random picks from curated film schedules"
)]
pub struct Cli {
    /// Defaults to `serve` when omitted.
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Sync schedules, then serve the web page until shut down.
    Serve {
        #[arg(long, default_value_t = false)]
        no_browser: bool,
    },
    /// Reconcile the database with the schedules file.
    Sync,
    Pick {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        schedule: Option<String>,
    },
    Watch {
        title: String,
        #[arg(long)]
        schedule: Option<String>,
    },
    Status {
        #[arg(long)]
        schedule: Option<String>,
    },
    List {
        #[arg(long)]
        schedule: Option<String>,
    },
    /// Write one CSV of titles per schedule.
    Export {
        #[arg(long, default_value_t = false)]
        overwrite: bool,
    },
    Backup,
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    Set { key: String, value: String },
    Get { key: String },
}
