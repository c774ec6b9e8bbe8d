use crate::db::Database;
use crate::error::Result;
use crate::schedule::Schedule;
use serde::Serialize;
use std::path::Path;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScheduleSync {
    pub name: String,
    pub created: bool,
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateWarning {
    pub table: String,
    pub duplicates: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncFailure {
    pub target: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub schedules: Vec<ScheduleSync>,
    pub dropped: Vec<String>,
    pub duplicates: Vec<DuplicateWarning>,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    pub fn schedule(&self, name: &str) -> Option<&ScheduleSync> {
        self.schedules.iter().find(|entry| entry.name == name)
    }

    pub fn total_added(&self) -> usize {
        self.schedules.iter().map(|entry| entry.added.len()).sum()
    }

    pub fn total_removed(&self) -> usize {
        self.schedules.iter().map(|entry| entry.removed.len()).sum()
    }

    fn fail(&mut self, target: &str, error: impl std::fmt::Display) {
        error!(target_table = target, error = %error, "schedule sync step failed");
        self.failures.push(SyncFailure {
            target: target.to_string(),
            error: error.to_string(),
        });
    }
}

/// Reconciles the store with the desired schedules: creates missing tables,
/// adds and removes titles, drops tables no schedule claims, then reports
/// duplicate titles. A failure on one table is recorded and the pass moves
/// on; only failing to open or enumerate the store aborts.
pub fn sync_schedules(db_path: &Path, schedules: &[Schedule]) -> Result<SyncReport> {
    let mut database = Database::open(db_path)?;
    let existing = database.table_names()?;
    let mut report = SyncReport::default();

    for schedule in schedules {
        let duplicated = schedule.duplicate_titles();
        if !duplicated.is_empty() {
            warn!(
                schedule = %schedule.name,
                titles = %duplicated.join(", "),
                "schedule definition lists titles more than once"
            );
        }

        // SQLite table names ignore ASCII case, so a renamed-by-case schedule
        // keeps its table and progress.
        let stored = existing
            .iter()
            .find(|table| table.eq_ignore_ascii_case(&schedule.name));
        if let Some(stored) = stored {
            if stored != &schedule.name {
                warn!(
                    schedule = %schedule.name,
                    table = %stored,
                    "schedule name differs from its table only by case"
                );
            }
            match database.sync_films(schedule) {
                Ok(diff) => {
                    if !diff.added.is_empty() {
                        info!(
                            schedule = %schedule.name,
                            count = diff.added.len(),
                            titles = %diff.added.join(", "),
                            "added films"
                        );
                    }
                    if !diff.removed.is_empty() {
                        info!(
                            schedule = %schedule.name,
                            count = diff.removed.len(),
                            titles = %diff.removed.join(", "),
                            "removed films"
                        );
                    }
                    report.schedules.push(ScheduleSync {
                        name: schedule.name.clone(),
                        created: false,
                        added: diff.added,
                        removed: diff.removed,
                    });
                }
                Err(error) => report.fail(&schedule.name, error),
            }
        } else {
            match database.create_schedule_table(schedule) {
                Ok(inserted) => {
                    info!(schedule = %schedule.name, films = inserted, "created schedule table");
                    report.schedules.push(ScheduleSync {
                        name: schedule.name.clone(),
                        created: true,
                        added: schedule.titles().map(ToOwned::to_owned).collect(),
                        removed: Vec::new(),
                    });
                }
                Err(error) => report.fail(&schedule.name, error),
            }
        }
    }

    for table in existing
        .iter()
        .filter(|table| {
            !schedules
                .iter()
                .any(|schedule| schedule.name.eq_ignore_ascii_case(table))
        })
    {
        match database.drop_table(table) {
            Ok(()) => {
                info!(table = %table, "dropped table with no schedule");
                report.dropped.push(table.clone());
            }
            Err(error) => report.fail(table, error),
        }
    }

    verify_tables(&database, &mut report);

    Ok(report)
}

fn verify_tables(database: &Database, report: &mut SyncReport) {
    let tables = match database.table_names() {
        Ok(tables) => tables,
        Err(error) => {
            report.fail("*", error);
            return;
        }
    };

    for table in &tables {
        match database.duplicate_count(table) {
            Ok(0) => {}
            Ok(duplicates) => {
                warn!(table = %table, duplicates, "found duplicate titles");
                report.duplicates.push(DuplicateWarning {
                    table: table.clone(),
                    duplicates,
                });
            }
            Err(error) => report.fail(table, error),
        }
    }

    if report.duplicates.is_empty() {
        info!(tables = tables.len(), "all tables are clean, no duplicates found");
    }
}
