pub mod queries;

use crate::error::{Result, TrackerError};
use crate::schedule::{Schedule, validate_schedule_name};
use rusqlite::{Connection, params};
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PickedFilm {
    pub id: i64,
    pub title: String,
    pub appearances: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilmRow {
    pub id: i64,
    pub title: String,
    pub appearances: i64,
    pub watched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct WatchCounts {
    pub total: i64,
    pub unwatched: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilmDiff {
    pub added: Vec<String>,
    pub removed: Vec<String>,
}

impl FilmDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// One open connection to the schedule store. Callers open a `Database` per
/// logical operation and let it drop when the operation ends.
pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    pub fn table_names(&self) -> Result<Vec<String>> {
        let mut statement = self.conn.prepare(queries::LIST_TABLES)?;
        let names = statement
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<String>, _>>()?;

        Ok(names)
    }

    pub fn has_table(&self, table: &str) -> Result<bool> {
        let count: i64 = self
            .conn
            .query_row(queries::TABLE_EXISTS, params![table], |row| row.get(0))?;
        Ok(count > 0)
    }

    /// For names supplied by callers: validated before the lookup.
    fn require_table(&self, table: &str) -> Result<()> {
        validate_schedule_name(table)?;
        self.require_existing(table)
    }

    fn require_existing(&self, table: &str) -> Result<()> {
        if self.has_table(table)? {
            Ok(())
        } else {
            Err(TrackerError::not_found(table))
        }
    }

    /// Creates the schedule's table and inserts every film unwatched with
    /// zero appearances. Returns the number of rows inserted.
    pub fn create_schedule_table(&mut self, schedule: &Schedule) -> Result<usize> {
        validate_schedule_name(&schedule.name)?;

        let transaction = self.conn.transaction()?;
        transaction.execute(&queries::create_schedule_table(&schedule.name), [])?;
        {
            let mut insert = transaction.prepare(&queries::insert_film(&schedule.name))?;
            for title in schedule.titles() {
                insert.execute(params![title, 0_i64, false])?;
            }
        }
        transaction.commit()?;

        Ok(schedule.films.len())
    }

    /// Brings an existing table in line with the schedule: inserts titles it
    /// lacks and deletes rows whose title the schedule no longer lists.
    pub fn sync_films(&mut self, schedule: &Schedule) -> Result<FilmDiff> {
        self.require_table(&schedule.name)?;

        let transaction = self.conn.transaction()?;
        let existing = {
            let mut statement = transaction.prepare(&queries::select_titles(&schedule.name))?;
            let rows = statement
                .query_map([], |row| {
                    Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        let existing_titles = existing
            .iter()
            .filter_map(|(_, title)| title.as_deref())
            .collect::<HashSet<_>>();
        let desired_titles = schedule.titles().collect::<HashSet<_>>();

        let added = schedule
            .titles()
            .filter(|title| !existing_titles.contains(title))
            .map(ToOwned::to_owned)
            .collect::<Vec<_>>();

        let stale = existing
            .iter()
            .filter(|(_, title)| {
                title
                    .as_deref()
                    .is_none_or(|title| !desired_titles.contains(title))
            })
            .collect::<Vec<_>>();

        let mut removed = Vec::new();
        for (_, title) in &stale {
            let title = title.clone().unwrap_or_default();
            if !removed.contains(&title) {
                removed.push(title);
            }
        }

        {
            let mut insert = transaction.prepare(&queries::insert_film(&schedule.name))?;
            for title in &added {
                insert.execute(params![title, 0_i64, false])?;
            }

            let mut delete = transaction.prepare(&queries::delete_film(&schedule.name))?;
            for (id, _) in &stale {
                delete.execute(params![id])?;
            }
        }
        transaction.commit()?;

        Ok(FilmDiff { added, removed })
    }

    /// Accepts any name `table_names` returned; the identifier is quoted.
    pub fn drop_table(&self, table: &str) -> Result<()> {
        self.conn.execute(&queries::drop_table(table), [])?;
        Ok(())
    }

    /// Number of distinct titles that occur more than once in the table.
    pub fn duplicate_count(&self, table: &str) -> Result<i64> {
        self.require_existing(table)?;
        let count = self
            .conn
            .query_row(&queries::duplicate_count(table), [], |row| row.get(0))?;
        Ok(count)
    }

    /// Selects up to `limit` random unwatched rows and bumps their
    /// appearance counters in the same transaction. Returned appearances
    /// are the post-increment values.
    pub fn pick_unwatched(&mut self, table: &str, limit: usize) -> Result<Vec<PickedFilm>> {
        self.require_table(table)?;
        if limit == 0 {
            return Ok(Vec::new());
        }

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let transaction = self.conn.transaction()?;

        let selected = {
            let mut statement = transaction.prepare(&queries::select_random_unwatched(table))?;
            let rows = statement
                .query_map(params![limit], |row| {
                    Ok(PickedFilm {
                        id: row.get(0)?,
                        title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                        appearances: row.get::<_, Option<i64>>(2)?.unwrap_or_default(),
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            rows
        };

        {
            let mut increment = transaction.prepare(&queries::increment_appearances(table))?;
            for film in &selected {
                increment.execute(params![film.id])?;
            }
        }
        transaction.commit()?;

        Ok(selected
            .into_iter()
            .map(|film| PickedFilm {
                appearances: film.appearances + 1,
                ..film
            })
            .collect())
    }

    /// Flags every row titled exactly `title` as watched. Returns the number
    /// of rows changed; zero is not an error.
    pub fn mark_watched(&self, table: &str, title: &str) -> Result<usize> {
        if title.trim().is_empty() {
            return Err(TrackerError::invalid("Empty title provided"));
        }
        self.require_table(table)?;

        let changed = self
            .conn
            .execute(&queries::mark_watched(table), params![title])?;
        Ok(changed)
    }

    pub fn counts(&self, table: &str) -> Result<WatchCounts> {
        self.require_table(table)?;

        let (total, watched): (i64, i64) = self
            .conn
            .query_row(&queries::counts(table), [], |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?;

        Ok(WatchCounts {
            total,
            unwatched: total - watched,
        })
    }

    pub fn films(&self, table: &str) -> Result<Vec<FilmRow>> {
        self.require_table(table)?;

        let mut statement = self.conn.prepare(&queries::select_films(table))?;
        let rows = statement
            .query_map([], |row| {
                Ok(FilmRow {
                    id: row.get(0)?,
                    title: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
                    appearances: row.get::<_, Option<i64>>(2)?.unwrap_or_default(),
                    watched: row.get::<_, Option<bool>>(3)?.unwrap_or(false),
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    #[cfg(test)]
    pub(crate) fn execute_raw(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Database, FilmDiff, WatchCounts};
    use crate::error::TrackerError;
    use crate::schedule::Schedule;
    use std::collections::HashSet;

    fn seeded(titles: &[&str]) -> Database {
        let mut database = Database::open_in_memory().expect("in-memory db");
        database
            .create_schedule_table(&Schedule::new("Test", titles.iter().copied()))
            .expect("create table");
        database
    }

    fn titles(database: &Database) -> HashSet<String> {
        database
            .films("Test")
            .expect("films")
            .into_iter()
            .map(|row| row.title)
            .collect()
    }

    #[test]
    fn create_inserts_every_film_unwatched() {
        let database = seeded(&["A", "B", "C"]);
        let rows = database.films("Test").expect("films");

        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| !row.watched && row.appearances == 0));
        assert_eq!(database.table_names().expect("tables"), vec!["Test"]);
    }

    #[test]
    fn pick_watch_count_scenario() {
        let mut database = seeded(&["A", "B", "C"]);

        let first = database.pick_unwatched("Test", 3).expect("pick");
        assert_eq!(first.len(), 3);
        assert!(first.iter().all(|film| film.appearances == 1));

        database.mark_watched("Test", "B").expect("mark watched");

        let mut second = database.pick_unwatched("Test", 3).expect("pick");
        second.sort_by(|left, right| left.title.cmp(&right.title));
        assert_eq!(
            second
                .iter()
                .map(|film| (film.title.as_str(), film.appearances))
                .collect::<Vec<_>>(),
            vec![("A", 2), ("C", 2)]
        );

        assert_eq!(
            database.counts("Test").expect("counts"),
            WatchCounts {
                total: 3,
                unwatched: 2
            }
        );
    }

    #[test]
    fn pick_respects_limit_and_leaves_others_untouched() {
        let mut database = seeded(&["A", "B", "C", "D", "E"]);

        let picked = database.pick_unwatched("Test", 2).expect("pick");
        assert_eq!(picked.len(), 2);

        let picked_ids = picked.iter().map(|film| film.id).collect::<HashSet<_>>();
        assert_eq!(picked_ids.len(), 2);

        for row in database.films("Test").expect("films") {
            let expected = if picked_ids.contains(&row.id) { 1 } else { 0 };
            assert_eq!(row.appearances, expected, "row {}", row.title);
        }
    }

    #[test]
    fn pick_with_nothing_unwatched_is_empty() {
        let mut database = seeded(&["A"]);
        database.mark_watched("Test", "A").expect("mark watched");

        assert!(database.pick_unwatched("Test", 3).expect("pick").is_empty());
        assert!(database.pick_unwatched("Test", 0).expect("pick").is_empty());
    }

    #[test]
    fn watched_titles_never_come_back() {
        let mut database = seeded(&["A", "B", "C", "D"]);
        database.mark_watched("Test", "C").expect("mark watched");

        for _ in 0..20 {
            let picked = database.pick_unwatched("Test", 4).expect("pick");
            assert!(picked.iter().all(|film| film.title != "C"));
        }
    }

    #[test]
    fn empty_title_is_rejected_without_writes() {
        let database = seeded(&["A", "B"]);

        let error = database.mark_watched("Test", "").expect_err("empty title");
        assert!(matches!(error, TrackerError::InvalidArgument(_)));
        let error = database.mark_watched("Test", "   ").expect_err("blank title");
        assert!(matches!(error, TrackerError::InvalidArgument(_)));

        assert!(
            database
                .films("Test")
                .expect("films")
                .iter()
                .all(|row| !row.watched)
        );
    }

    #[test]
    fn unknown_title_is_a_no_op() {
        let database = seeded(&["A"]);
        assert_eq!(database.mark_watched("Test", "a").expect("mark"), 0);
        assert_eq!(database.counts("Test").expect("counts").unwatched, 1);
    }

    #[test]
    fn unknown_schedule_is_not_found() {
        let mut database = seeded(&["A"]);

        assert!(matches!(
            database.counts("Missing"),
            Err(TrackerError::NotFound { .. })
        ));
        assert!(matches!(
            database.pick_unwatched("Missing", 3),
            Err(TrackerError::NotFound { .. })
        ));
        assert!(matches!(
            database.mark_watched("Missing", "A"),
            Err(TrackerError::NotFound { .. })
        ));
    }

    #[test]
    fn null_watched_counts_as_unwatched() {
        let database = seeded(&["A", "B", "C"]);
        database
            .execute_raw(
                "UPDATE \"Test\" SET watched = NULL WHERE name = 'A';
                 UPDATE \"Test\" SET watched = 1 WHERE name = 'B';",
            )
            .expect("raw update");

        assert_eq!(
            database.counts("Test").expect("counts"),
            WatchCounts {
                total: 3,
                unwatched: 2
            }
        );
    }

    #[test]
    fn sync_adds_and_removes_titles() {
        let mut database = seeded(&["A", "B"]);

        let diff = database
            .sync_films(&Schedule::new("Test", ["B", "C"]))
            .expect("sync");
        assert_eq!(
            diff,
            FilmDiff {
                added: vec!["C".to_string()],
                removed: vec!["A".to_string()],
            }
        );
        assert_eq!(
            titles(&database),
            HashSet::from(["B".to_string(), "C".to_string()])
        );

        let again = database
            .sync_films(&Schedule::new("Test", ["B", "C"]))
            .expect("sync");
        assert!(again.is_empty());
    }

    #[test]
    fn sync_preserves_progress_of_kept_titles() {
        let mut database = seeded(&["A", "B"]);
        database.mark_watched("Test", "B").expect("mark watched");

        database
            .sync_films(&Schedule::new("Test", ["B", "C"]))
            .expect("sync");

        let b = database
            .films("Test")
            .expect("films")
            .into_iter()
            .find(|row| row.title == "B")
            .expect("B kept");
        assert!(b.watched);
    }

    #[test]
    fn duplicate_count_reports_repeated_titles() {
        let database = seeded(&["A", "A", "B", "C", "C", "C"]);
        assert_eq!(database.duplicate_count("Test").expect("dupes"), 2);
    }

    #[test]
    fn table_lookup_ignores_case() {
        let mut database = seeded(&["A", "B"]);

        assert!(database.has_table("test").expect("lookup"));
        assert_eq!(database.counts("TEST").expect("counts").total, 2);
        assert_eq!(database.pick_unwatched("test", 1).expect("pick").len(), 1);
    }

    #[test]
    fn tables_outside_the_naming_rules_can_still_be_inspected_and_dropped() {
        let database = seeded(&["A"]);
        database
            .execute_raw(
                "CREATE TABLE \"Old List\" (id INTEGER PRIMARY KEY, name TEXT, appearances INTEGER, watched BOOLEAN);
                 INSERT INTO \"Old List\" (name) VALUES ('X'), ('X');",
            )
            .expect("raw table");

        assert_eq!(database.duplicate_count("Old List").expect("dupes"), 1);
        database.drop_table("Old List").expect("drop");
        assert_eq!(database.table_names().expect("tables"), vec!["Test"]);
    }

    #[test]
    fn drop_table_removes_schedule() {
        let database = seeded(&["A"]);
        database.drop_table("Test").expect("drop");
        assert!(database.table_names().expect("tables").is_empty());
    }
}
