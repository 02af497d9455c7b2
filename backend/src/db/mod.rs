//! SQLite persistence.
//!
//! One connection is opened at start-up and shared behind a mutex. Each repository
//! function takes a `&Connection` and issues single statements only, so every write
//! is atomic on its own row and no multi-row transaction is ever needed.

pub mod submissions;
pub mod templates;
pub mod users;

use crate::error::ApiError;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::types::Type;
use rusqlite::{Connection, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY,
    nstin         TEXT NOT NULL UNIQUE,
    name          TEXT NOT NULL,
    email         TEXT NOT NULL UNIQUE,
    phone         TEXT NOT NULL,
    role          TEXT NOT NULL CHECK (role IN ('user', 'admin')),
    password_hash TEXT NOT NULL,
    created_at    TEXT NOT NULL,
    updated_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS templates (
    id                TEXT PRIMARY KEY,
    name              TEXT NOT NULL,
    description       TEXT NOT NULL,
    template_type     TEXT NOT NULL,
    file_url          TEXT NOT NULL,
    file_reference    TEXT NOT NULL,
    version           TEXT NOT NULL DEFAULT '1.0',
    original_filename TEXT,
    file_extension    TEXT,
    download_count    INTEGER NOT NULL DEFAULT 0,
    is_active         INTEGER NOT NULL DEFAULT 1,
    created_at        TEXT NOT NULL,
    updated_at        TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS submissions (
    id                       TEXT PRIMARY KEY,
    user_id                  TEXT NOT NULL,
    template_type            TEXT NOT NULL,
    tax_period               TEXT NOT NULL,
    main_file_url            TEXT NOT NULL CHECK (main_file_url <> ''),
    main_file_reference      TEXT NOT NULL CHECK (main_file_reference <> ''),
    supporting_doc_url       TEXT NOT NULL CHECK (supporting_doc_url <> ''),
    supporting_doc_reference TEXT NOT NULL CHECK (supporting_doc_reference <> ''),
    comments                 TEXT,
    status                   TEXT NOT NULL DEFAULT 'pending'
                             CHECK (status IN ('pending', 'approved', 'rejected')),
    reviewed_at              TEXT,
    reviewed_by              TEXT,
    review_comments          TEXT,
    created_at               TEXT NOT NULL,
    updated_at               TEXT NOT NULL,
    CHECK (
        (status = 'pending' AND reviewed_at IS NULL AND reviewed_by IS NULL AND review_comments IS NULL)
        OR
        (status <> 'pending' AND reviewed_at IS NOT NULL AND reviewed_by IS NOT NULL AND review_comments IS NOT NULL)
    )
);

CREATE INDEX IF NOT EXISTS idx_submissions_user ON submissions (user_id, created_at);
CREATE INDEX IF NOT EXISTS idx_submissions_status ON submissions (status);
CREATE INDEX IF NOT EXISTS idx_templates_active ON templates (is_active, created_at);
";

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, rusqlite::Error> {
        let conn = Connection::open(path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, rusqlite::Error> {
        conn.busy_timeout(std::time::Duration::from_secs(5))?;
        register_functions(&conn)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Runs `f` with exclusive access to the connection.
    pub fn call<T, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Connection) -> Result<T, rusqlite::Error>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|_| ApiError::internal("database connection lock poisoned"))?;
        Ok(f(&conn)?)
    }
}

/// SQLite's `lower()` and `LIKE` fold ASCII only. `fold(x)` lowercases the full Unicode
/// range so search terms match accented names in any case.
fn register_functions(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.create_scalar_function(
        "fold",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| Ok(ctx.get::<Option<String>>(0)?.map(|text| text.to_lowercase())),
    )
}

/// Timestamps are stored as fixed-width RFC 3339 text so they sort lexicographically.
pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(row: &Row<'_>, idx: usize) -> Result<DateTime<Utc>, rusqlite::Error> {
    let raw: String = row.get(idx)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Reads a TEXT column holding one of the closed enumerations.
pub(crate) fn parse_enum<T>(row: &Row<'_>, idx: usize) -> Result<T, rusqlite::Error>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    let raw: String = row.get(idx)?;
    raw.parse()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

/// Turns a free-text search term into a lowercased `LIKE` pattern, matched against
/// `fold(column)` with `ESCAPE '\'`.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for ch in term.to_lowercase().chars() {
        if matches!(ch, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}

/// Offset of the first row on a 1-based page.
pub(crate) fn page_offset(page: u32, page_size: u32) -> i64 {
    i64::from(page.max(1) - 1) * i64::from(page_size)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("ab"), "%ab%");
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("ÉMILE"), "%émile%");
    }

    #[test]
    fn fold_lowercases_beyond_ascii() {
        let db = Database::open_in_memory().unwrap();
        let (folded, matched): (String, bool) = db
            .call(|conn| {
                conn.query_row(
                    "SELECT fold('Émile ÔKAFOR'), fold('Émile Ôkafor') LIKE ?1 ESCAPE '\\'",
                    [like_pattern("émile ô")],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
            })
            .unwrap();
        assert_eq!(folded, "émile ôkafor");
        assert!(matched);
    }

    #[test]
    fn timestamps_sort_chronologically() {
        let earlier = DateTime::parse_from_rfc3339("2024-01-01T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let later = earlier + chrono::Duration::milliseconds(1);
        assert!(timestamp(&earlier) < timestamp(&later));
        assert_eq!(timestamp(&earlier), "2024-01-01T09:00:00.000Z");
    }

    #[test]
    fn page_offset_clamps_to_first_page() {
        assert_eq!(page_offset(0, 10), 0);
        assert_eq!(page_offset(1, 10), 0);
        assert_eq!(page_offset(3, 10), 20);
    }

    #[test]
    fn schema_applies_twice() {
        let db = Database::open_in_memory().unwrap();
        db.call(|conn| conn.execute_batch(SCHEMA)).unwrap();
    }
}
