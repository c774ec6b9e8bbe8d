use crate::schedule::validate_schedule_name;
use crate::tracker::DEFAULT_PICK_LIMIT;
use anyhow::{Context, Result, anyhow, bail};
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

const APP_DIR: &str = ".film-tracker";
const CONFIG_FILE: &str = "config.json";
const SCHEDULES_FILE: &str = "schedules.json";
const DEFAULT_SCHEDULE: &str = "Schedule_test";
const MAX_PICK_LIMIT: usize = 50;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: PathBuf,
    pub schedules_path: PathBuf,
    pub active_schedule: String,
    pub api_port: u16,
    pub pick_limit: usize,
    pub csv_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub open_browser: bool,
}

impl Default for Config {
    fn default() -> Self {
        let root = default_root_dir();

        Self {
            db_path: root.join("db").join("schedule.db"),
            schedules_path: root.join(SCHEDULES_FILE),
            active_schedule: DEFAULT_SCHEDULE.to_string(),
            api_port: 5000,
            pick_limit: DEFAULT_PICK_LIMIT,
            csv_dir: root.join("csv"),
            backup_dir: root.join("backups"),
            open_browser: true,
        }
    }
}

impl Config {
    pub fn config_path() -> PathBuf {
        default_root_dir().join(CONFIG_FILE)
    }

    /// Writes defaults when no file exists yet. A file that exists but
    /// cannot be read or parsed is an error and is left untouched.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load_from(path);
        }

        let config = Self::default();
        config.save_to(path)?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let content = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Creates the data directories and seeds the schedules file from the
    /// bundled definitions when it does not exist yet.
    pub fn ensure_bootstrap_files(&self) -> Result<()> {
        if let Some(parent) = self.db_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create DB directory: {}", parent.display()))?;
        }

        if !self.schedules_path.exists() {
            if let Some(parent) = self.schedules_path.parent() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create schedules directory: {}", parent.display())
                })?;
            }
            fs::write(
                &self.schedules_path,
                include_str!("../assets/schedules.json"),
            )
            .with_context(|| {
                format!(
                    "Failed to create default schedules file: {}",
                    self.schedules_path.display()
                )
            })?;
        }

        Ok(())
    }

    pub fn set_value(&mut self, key: &str, value: &str) -> Result<()> {
        match normalize_config_key(key) {
            "db_path" => {
                self.db_path = expand_home(value);
            }
            "schedules_path" => {
                self.schedules_path = expand_home(value);
            }
            "active_schedule" => {
                let name = value.trim();
                validate_schedule_name(name)?;
                self.active_schedule = name.to_string();
            }
            "api_port" => {
                self.api_port = value
                    .parse::<u16>()
                    .map_err(|_| anyhow!("api_port must be a number"))?;
            }
            "pick_limit" => {
                let parsed = value
                    .parse::<usize>()
                    .map_err(|_| anyhow!("pick_limit must be a number"))?;
                if parsed == 0 || parsed > MAX_PICK_LIMIT {
                    bail!("pick_limit must be between 1 and {MAX_PICK_LIMIT}");
                }
                self.pick_limit = parsed;
            }
            "csv_dir" => {
                self.csv_dir = expand_home(value);
            }
            "backup_dir" => {
                self.backup_dir = expand_home(value);
            }
            "open_browser" => {
                self.open_browser = value
                    .parse::<bool>()
                    .map_err(|_| anyhow!("open_browser must be true/false"))?;
            }
            _ => {
                bail!(
                    "Unsupported config key: {key}. Supported keys: db_path|db.path, schedules_path|schedules.path, active_schedule|schedule.active, api_port|api.port, pick_limit|pick.limit, csv_dir|csv.dir, backup_dir|backup.dir, open_browser|browser.open"
                );
            }
        }

        Ok(())
    }

    pub fn get_value(&self, key: &str) -> Option<String> {
        match normalize_config_key(key) {
            "db_path" => Some(self.db_path.display().to_string()),
            "schedules_path" => Some(self.schedules_path.display().to_string()),
            "active_schedule" => Some(self.active_schedule.clone()),
            "api_port" => Some(self.api_port.to_string()),
            "pick_limit" => Some(self.pick_limit.to_string()),
            "csv_dir" => Some(self.csv_dir.display().to_string()),
            "backup_dir" => Some(self.backup_dir.display().to_string()),
            "open_browser" => Some(self.open_browser.to_string()),
            _ => None,
        }
    }
}

fn normalize_config_key(key: &str) -> &str {
    match key {
        "db_path" | "db.path" => "db_path",
        "schedules_path" | "schedules.path" => "schedules_path",
        "active_schedule" | "schedule.active" => "active_schedule",
        "api_port" | "api.port" => "api_port",
        "pick_limit" | "pick.limit" => "pick_limit",
        "csv_dir" | "csv.dir" => "csv_dir",
        "backup_dir" | "backup.dir" => "backup_dir",
        "open_browser" | "browser.open" => "open_browser",
        _ => key,
    }
}

pub fn expand_home(raw: &str) -> PathBuf {
    raw.strip_prefix("~/")
        .and_then(|stripped| home_dir().map(|home| home.join(stripped)))
        .unwrap_or_else(|| PathBuf::from(raw))
}

fn default_root_dir() -> PathBuf {
    home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}
