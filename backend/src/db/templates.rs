use crate::db::{parse_enum, parse_timestamp, timestamp};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use taxdesk_common::model::template::{Template, TemplateSummary};
use taxdesk_common::requests::UpdateTemplateRequest;

const COLUMNS: &str = "id, name, description, template_type, file_url, file_reference, version,
    original_filename, file_extension, download_count, is_active, created_at, updated_at";

fn from_row(row: &Row<'_>) -> Result<Template, rusqlite::Error> {
    Ok(Template {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        template_type: parse_enum(row, 3)?,
        file_url: row.get(4)?,
        file_reference: row.get(5)?,
        version: row.get(6)?,
        original_filename: row.get(7)?,
        file_extension: row.get(8)?,
        download_count: row.get(9)?,
        is_active: row.get(10)?,
        created_at: parse_timestamp(row, 11)?,
        updated_at: parse_timestamp(row, 12)?,
    })
}

pub fn insert(conn: &Connection, template: &Template) -> Result<(), rusqlite::Error> {
    conn.execute(
        &format!("INSERT INTO templates ({COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)"),
        params![
            template.id,
            template.name,
            template.description,
            template.template_type.as_str(),
            template.file_url,
            template.file_reference,
            template.version,
            template.original_filename,
            template.file_extension,
            template.download_count,
            template.is_active,
            timestamp(&template.created_at),
            timestamp(&template.updated_at),
        ],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, id: &str) -> Result<Option<Template>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM templates WHERE id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

/// Newest first. Inactive templates are included only when `active_only` is false.
pub fn list(conn: &Connection, active_only: bool) -> Result<Vec<Template>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM templates WHERE (?1 = 0 OR is_active = 1)
         ORDER BY created_at DESC, rowid DESC"
    ))?;
    let rows = stmt.query_map(params![active_only], from_row)?;
    rows.collect()
}

pub fn list_active_summaries(conn: &Connection) -> Result<Vec<TemplateSummary>, rusqlite::Error> {
    let mut stmt = conn.prepare(
        "SELECT id, name, template_type FROM templates WHERE is_active = 1
         ORDER BY template_type ASC, name ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(TemplateSummary {
            id: row.get(0)?,
            name: row.get(1)?,
            template_type: parse_enum(row, 2)?,
        })
    })?;
    rows.collect()
}

pub fn count_active(conn: &Connection) -> Result<u64, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*) FROM templates WHERE is_active = 1",
        [],
        |row| row.get(0),
    )
}

pub fn deactivate(conn: &Connection, id: &str, at: &DateTime<Utc>) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE templates SET is_active = 0, updated_at = ?2 WHERE id = ?1",
        params![id, timestamp(at)],
    )
}

/// Bumps the counter in place so concurrent downloads are never lost.
pub fn increment_downloads(conn: &Connection, id: &str) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE templates SET download_count = download_count + 1 WHERE id = ?1",
        params![id],
    )
}

pub fn update_metadata(
    conn: &Connection,
    id: &str,
    changes: &UpdateTemplateRequest,
    at: &DateTime<Utc>,
) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE templates SET
            name = COALESCE(?2, name),
            description = COALESCE(?3, description),
            template_type = COALESCE(?4, template_type),
            version = COALESCE(?5, version),
            updated_at = ?6
         WHERE id = ?1",
        params![
            id,
            changes.name,
            changes.description,
            changes.template_type.map(|t| t.as_str()),
            changes.version,
            timestamp(at),
        ],
    )
}
