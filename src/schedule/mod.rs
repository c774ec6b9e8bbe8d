pub mod export;

use crate::error::{Result, TrackerError};
use anyhow::Context;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

static SCHEDULE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid schedule name regex"));

/// One film as declared in a schedule definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "FilmSpec")]
pub struct FilmEntry {
    pub title: String,
    pub appearances: i64,
    pub watched: bool,
}

impl FilmEntry {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            appearances: 0,
            watched: false,
        }
    }
}

/// Definitions may list a film as a bare title or as a full entry.
#[derive(Deserialize)]
#[serde(untagged)]
enum FilmSpec {
    Title(String),
    Entry {
        title: String,
        #[serde(default)]
        appearances: i64,
        #[serde(default)]
        watched: bool,
    },
}

impl From<FilmSpec> for FilmEntry {
    fn from(spec: FilmSpec) -> Self {
        match spec {
            FilmSpec::Title(title) => FilmEntry::new(title),
            FilmSpec::Entry {
                title,
                appearances,
                watched,
            } => FilmEntry {
                title,
                appearances: appearances.max(0),
                watched,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub name: String,
    pub films: Vec<FilmEntry>,
}

impl Schedule {
    pub fn new<I, S>(name: impl Into<String>, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            films: titles.into_iter().map(FilmEntry::new).collect(),
        }
    }

    pub fn titles(&self) -> impl Iterator<Item = &str> {
        self.films.iter().map(|film| film.title.as_str())
    }

    /// Titles listed more than once in this definition, in first-seen order.
    pub fn duplicate_titles(&self) -> Vec<String> {
        let counts = self.titles().fold(HashMap::new(), |mut acc, title| {
            *acc.entry(title).or_insert(0_usize) += 1;
            acc
        });

        let mut reported = Vec::new();
        for title in self.titles() {
            if counts.get(title).copied().unwrap_or_default() > 1
                && !reported.iter().any(|seen: &String| seen == title)
            {
                reported.push(title.to_string());
            }
        }
        reported
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleBook {
    pub schedules: Vec<Schedule>,
}

impl ScheduleBook {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read schedules file: {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse schedules file: {}", path.display()))
    }

    pub fn parse(content: &str) -> anyhow::Result<Self> {
        let book: Self = serde_json::from_str(content)?;
        book.validate()?;
        Ok(book)
    }

    pub fn get(&self, name: &str) -> Option<&Schedule> {
        self.schedules.iter().find(|schedule| schedule.name == name)
    }

    /// Names map to SQLite tables, which ignore ASCII case, so `Noir` and
    /// `noir` count as the same schedule.
    fn validate(&self) -> Result<()> {
        let mut seen: Vec<&str> = Vec::with_capacity(self.schedules.len());
        for schedule in &self.schedules {
            validate_schedule_name(&schedule.name)?;
            if let Some(previous) = seen
                .iter()
                .find(|name| name.eq_ignore_ascii_case(&schedule.name))
            {
                return Err(TrackerError::invalid(format!(
                    "schedule '{}' is defined more than once (already defined as '{previous}')",
                    schedule.name
                )));
            }
            seen.push(&schedule.name);
        }
        Ok(())
    }
}

/// Schedule names double as table identifiers.
pub fn validate_schedule_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(TrackerError::invalid("schedule name must not be empty"));
    }
    if !SCHEDULE_NAME.is_match(name) {
        return Err(TrackerError::invalid(format!(
            "schedule name '{name}' must contain only letters, digits and underscores"
        )));
    }
    if name.to_ascii_lowercase().starts_with("sqlite_") {
        return Err(TrackerError::invalid(format!(
            "schedule name '{name}' uses the reserved sqlite_ prefix"
        )));
    }
    Ok(())
}
