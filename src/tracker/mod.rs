pub mod sync;

use crate::db::{Database, FilmRow, PickedFilm, WatchCounts};
use crate::error::Result;
use std::path::Path;
use tracing::{debug, info};

pub const DEFAULT_PICK_LIMIT: usize = 3;

// Each call opens its own connection; it closes when `database` drops,
// on the error path as well.

pub fn pick(db_path: &Path, schedule: &str, limit: usize) -> Result<Vec<PickedFilm>> {
    let mut database = Database::open(db_path)?;
    let films = database.pick_unwatched(schedule, limit)?;

    debug!(schedule, limit, picked = films.len(), "picked unwatched films");
    Ok(films)
}

pub fn mark_watched(db_path: &Path, schedule: &str, title: &str) -> Result<usize> {
    let database = Database::open(db_path)?;
    let changed = database.mark_watched(schedule, title)?;

    if changed == 0 {
        debug!(schedule, title, "no film matched title");
    } else {
        info!(schedule, title, rows = changed, "film marked watched");
    }
    Ok(changed)
}

pub fn counts(db_path: &Path, schedule: &str) -> Result<WatchCounts> {
    Database::open(db_path)?.counts(schedule)
}

pub fn films(db_path: &Path, schedule: &str) -> Result<Vec<FilmRow>> {
    Database::open(db_path)?.films(schedule)
}

pub fn schedule_names(db_path: &Path) -> Result<Vec<String>> {
    Database::open(db_path)?.table_names()
}

#[cfg(test)]
mod tests {
    use super::{counts, mark_watched, pick, schedule_names};
    use crate::error::TrackerError;
    use crate::schedule::Schedule;
    use crate::tracker::sync::sync_schedules;

    #[test]
    fn operations_share_state_through_the_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("nested").join("schedule.db");
        sync_schedules(&db_path, &[Schedule::new("Test", ["A", "B", "C"])]).expect("sync");

        assert_eq!(schedule_names(&db_path).expect("names"), vec!["Test"]);

        let picked = pick(&db_path, "Test", 2).expect("pick");
        assert_eq!(picked.len(), 2);

        assert_eq!(mark_watched(&db_path, "Test", &picked[0].title).expect("mark"), 1);
        assert_eq!(counts(&db_path, "Test").expect("counts").unwatched, 2);
    }

    #[test]
    fn empty_title_fails_before_opening_schedule() {
        let dir = tempfile::tempdir().expect("tempdir");
        let db_path = dir.path().join("schedule.db");

        assert!(matches!(
            mark_watched(&db_path, "Never_created", ""),
            Err(TrackerError::InvalidArgument(_))
        ));
    }
}
