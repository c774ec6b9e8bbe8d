use crate::error::Result;
use chrono::{DateTime, Local};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::info;

pub fn backup_database(db_path: &Path, backup_dir: &Path) -> Result<PathBuf> {
    backup_database_at(db_path, backup_dir, Local::now())
}

fn backup_database_at(
    db_path: &Path,
    backup_dir: &Path,
    taken_at: DateTime<Local>,
) -> Result<PathBuf> {
    if !db_path.is_file() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("database file not found: {}", db_path.display()),
        )
        .into());
    }

    fs::create_dir_all(backup_dir)?;

    let stem = db_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "schedule".to_string());
    let target = backup_dir.join(format!("{stem}-{}.db", taken_at.format("%Y%m%d-%H%M%S")));

    fs::copy(db_path, &target)?;
    info!(source = %db_path.display(), target = %target.display(), "database backed up");

    Ok(target)
}
