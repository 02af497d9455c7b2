use crate::db::{like_pattern, page_offset, parse_enum, parse_timestamp, timestamp};
use rusqlite::{params, Connection, OptionalExtension, Row};
use taxdesk_common::model::user::{Role, User};

const COLUMNS: &str =
    "id, nstin, name, email, phone, role, created_at, updated_at, password_hash";

/// A user row together with its password hash. The hash stays inside the backend.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub user: User,
    pub password_hash: String,
}

fn from_row(row: &Row<'_>) -> Result<UserRecord, rusqlite::Error> {
    Ok(UserRecord {
        user: User {
            id: row.get(0)?,
            nstin: row.get(1)?,
            name: row.get(2)?,
            email: row.get(3)?,
            phone: row.get(4)?,
            role: parse_enum(row, 5)?,
            created_at: parse_timestamp(row, 6)?,
            updated_at: parse_timestamp(row, 7)?,
        },
        password_hash: row.get(8)?,
    })
}

pub fn insert(conn: &Connection, user: &User, password_hash: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO users (id, nstin, name, email, phone, role, password_hash, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            user.id,
            user.nstin,
            user.name,
            user.email,
            user.phone,
            user.role.as_str(),
            password_hash,
            timestamp(&user.created_at),
            timestamp(&user.updated_at),
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: &str) -> Result<Option<UserRecord>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM users WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

/// Looks an account up by NSTIN or, failing that, by email.
pub fn find_by_identifier(
    conn: &Connection,
    identifier: &str,
) -> Result<Option<UserRecord>, rusqlite::Error> {
    conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM users WHERE nstin = ?1 OR lower(email) = lower(?1)
             ORDER BY nstin = ?1 DESC LIMIT 1"
        ),
        params![identifier],
        from_row,
    )
    .optional()
}

/// True when another account (other than `exclude_id`) already holds the NSTIN or email.
pub fn identity_taken(
    conn: &Connection,
    nstin: Option<&str>,
    email: Option<&str>,
    exclude_id: Option<&str>,
) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT EXISTS (
            SELECT 1 FROM users
            WHERE (nstin = ?1 OR lower(email) = lower(?2))
              AND (?3 IS NULL OR id <> ?3)
        )",
        params![nstin, email, exclude_id],
        |row| row.get(0),
    )
}

pub fn update(conn: &Connection, user: &User) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE users SET name = ?2, email = ?3, phone = ?4, role = ?5, updated_at = ?6
         WHERE id = ?1",
        params![
            user.id,
            user.name,
            user.email,
            user.phone,
            user.role.as_str(),
            timestamp(&user.updated_at),
        ],
    )
}

pub fn set_password(
    conn: &Connection,
    id: &str,
    password_hash: &str,
    at: &chrono::DateTime<chrono::Utc>,
) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE users SET password_hash = ?2, updated_at = ?3 WHERE id = ?1",
        params![id, password_hash, timestamp(at)],
    )
}

pub fn delete(conn: &Connection, id: &str) -> Result<usize, rusqlite::Error> {
    conn.execute("DELETE FROM users WHERE id = ?1", params![id])
}

pub fn count_by_role(conn: &Connection, role: Role) -> Result<u64, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*) FROM users WHERE role = ?1",
        params![role.as_str()],
        |row| row.get(0),
    )
}

/// Newest-first page of accounts, optionally narrowed by a case-insensitive match on
/// name, NSTIN or email.
pub fn list(
    conn: &Connection,
    search: Option<&str>,
    page: u32,
    page_size: u32,
) -> Result<(Vec<User>, u64), rusqlite::Error> {
    let pattern = search.map(like_pattern);
    const FILTER: &str = "(?1 IS NULL
        OR fold(name) LIKE ?1 ESCAPE '\\'
        OR fold(nstin) LIKE ?1 ESCAPE '\\'
        OR fold(email) LIKE ?1 ESCAPE '\\')";

    let total: u64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM users WHERE {FILTER}"),
        params![pattern],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM users WHERE {FILTER}
         ORDER BY created_at DESC, rowid DESC LIMIT ?2 OFFSET ?3"
    ))?;
    let users = stmt
        .query_map(
            params![pattern, page_size, page_offset(page, page_size)],
            from_row,
        )?
        .map(|r| r.map(|record| record.user))
        .collect::<Result<Vec<_>, _>>()?;

    Ok((users, total))
}
