//! SQL for the table-per-schedule layout. Table names are always
//! double-quoted.

pub const LIST_TABLES: &str = "SELECT name FROM sqlite_master
     WHERE type = 'table' AND name NOT LIKE 'sqlite\\_%' ESCAPE '\\'
     ORDER BY name";

/// SQLite resolves table names without regard to ASCII case.
pub const TABLE_EXISTS: &str =
    "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE";

pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

pub fn create_schedule_table(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {} (
  id          INTEGER PRIMARY KEY,
  name        TEXT,
  appearances INTEGER,
  watched     BOOLEAN
);",
        quote_ident(table)
    )
}

pub fn drop_table(table: &str) -> String {
    format!("DROP TABLE IF EXISTS {}", quote_ident(table))
}

pub fn insert_film(table: &str) -> String {
    format!(
        "INSERT INTO {} (name, appearances, watched) VALUES (?1, ?2, ?3)",
        quote_ident(table)
    )
}

pub fn delete_film(table: &str) -> String {
    format!("DELETE FROM {} WHERE id = ?1", quote_ident(table))
}

pub fn select_titles(table: &str) -> String {
    format!("SELECT id, name FROM {} ORDER BY id", quote_ident(table))
}

pub fn select_films(table: &str) -> String {
    format!(
        "SELECT id, name, appearances, watched FROM {} ORDER BY id",
        quote_ident(table)
    )
}

pub fn select_random_unwatched(table: &str) -> String {
    format!(
        "SELECT id, name, appearances FROM {}
         WHERE watched = 0 OR watched IS NULL
         ORDER BY RANDOM()
         LIMIT ?1",
        quote_ident(table)
    )
}

pub fn increment_appearances(table: &str) -> String {
    format!(
        "UPDATE {} SET appearances = COALESCE(appearances, 0) + 1 WHERE id = ?1",
        quote_ident(table)
    )
}

pub fn mark_watched(table: &str) -> String {
    format!("UPDATE {} SET watched = 1 WHERE name = ?1", quote_ident(table))
}

pub fn counts(table: &str) -> String {
    format!(
        "SELECT COUNT(*), COALESCE(SUM(CASE WHEN watched = 1 THEN 1 ELSE 0 END), 0) FROM {}",
        quote_ident(table)
    )
}

pub fn duplicate_count(table: &str) -> String {
    format!(
        "SELECT COUNT(*) FROM (
           SELECT name FROM {} GROUP BY name HAVING COUNT(*) > 1
         )",
        quote_ident(table)
    )
}
