use crate::db::{like_pattern, page_offset, parse_enum, parse_timestamp, timestamp};
use rusqlite::{params, Connection, OptionalExtension, Row};
use taxdesk_common::model::document::StoredDocument;
use taxdesk_common::model::submission::{
    OwnerSummary, Review, Submission, SubmissionFilter, SubmissionStatus, SubmissionWithOwner,
};

const COLUMNS: &str = "s.id, s.user_id, s.template_type, s.tax_period,
    s.main_file_url, s.main_file_reference, s.supporting_doc_url, s.supporting_doc_reference,
    s.comments, s.status, s.reviewed_at, s.reviewed_by, s.review_comments,
    s.created_at, s.updated_at";

/// Number of columns in `COLUMNS`; owner columns follow at this offset.
const OWNER_OFFSET: usize = 15;

fn from_row(row: &Row<'_>) -> Result<Submission, rusqlite::Error> {
    let reviewed_at: Option<String> = row.get(10)?;
    let review = match reviewed_at {
        Some(_) => Some(Review {
            reviewed_at: parse_timestamp(row, 10)?,
            reviewed_by: row.get(11)?,
            review_comments: row.get(12)?,
        }),
        None => None,
    };

    Ok(Submission {
        id: row.get(0)?,
        user_id: row.get(1)?,
        template_type: parse_enum(row, 2)?,
        tax_period: row.get(3)?,
        main_file: StoredDocument {
            url: row.get(4)?,
            reference_id: row.get(5)?,
        },
        supporting_doc: StoredDocument {
            url: row.get(6)?,
            reference_id: row.get(7)?,
        },
        comments: row.get(8)?,
        status: parse_enum(row, 9)?,
        review,
        created_at: parse_timestamp(row, 13)?,
        updated_at: parse_timestamp(row, 14)?,
    })
}

fn with_owner_from_row(row: &Row<'_>) -> Result<SubmissionWithOwner, rusqlite::Error> {
    let owner_id: Option<String> = row.get(OWNER_OFFSET)?;
    let owner = match owner_id {
        Some(id) => Some(OwnerSummary {
            id,
            name: row.get(OWNER_OFFSET + 1)?,
            nstin: row.get(OWNER_OFFSET + 2)?,
            email: row.get(OWNER_OFFSET + 3)?,
        }),
        None => None,
    };
    Ok(SubmissionWithOwner {
        submission: from_row(row)?,
        owner,
    })
}

pub fn insert(conn: &Connection, submission: &Submission) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT INTO submissions (
            id, user_id, template_type, tax_period,
            main_file_url, main_file_reference, supporting_doc_url, supporting_doc_reference,
            comments, status, created_at, updated_at
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            submission.id,
            submission.user_id,
            submission.template_type.as_str(),
            submission.tax_period,
            submission.main_file.url,
            submission.main_file.reference_id,
            submission.supporting_doc.url,
            submission.supporting_doc.reference_id,
            submission.comments,
            submission.status.as_str(),
            timestamp(&submission.created_at),
            timestamp(&submission.updated_at),
        ],
    )?;
    Ok(())
}

pub fn find(conn: &Connection, id: &str) -> Result<Option<Submission>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {COLUMNS} FROM submissions s WHERE s.id = ?1"),
        params![id],
        from_row,
    )
    .optional()
}

/// Moves a pending submission to `status` and records the review in the same statement.
///
/// Returns the number of rows changed: zero means the submission is missing or has
/// already left `pending`, in which case nothing was written.
pub fn record_review(
    conn: &Connection,
    id: &str,
    status: SubmissionStatus,
    review: &Review,
) -> Result<usize, rusqlite::Error> {
    conn.execute(
        "UPDATE submissions
         SET status = ?2, reviewed_at = ?3, reviewed_by = ?4, review_comments = ?5, updated_at = ?3
         WHERE id = ?1 AND status = 'pending'",
        params![
            id,
            status.as_str(),
            timestamp(&review.reviewed_at),
            review.reviewed_by,
            review.review_comments,
        ],
    )
}

pub fn list_for_user(
    conn: &Connection,
    user_id: &str,
    limit: u32,
) -> Result<Vec<Submission>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS} FROM submissions s WHERE s.user_id = ?1
         ORDER BY s.created_at DESC, s.rowid DESC LIMIT ?2"
    ))?;
    let rows = stmt.query_map(params![user_id, limit], from_row)?;
    rows.collect()
}

pub fn count_by_status(conn: &Connection, status: SubmissionStatus) -> Result<u64, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*) FROM submissions WHERE status = ?1",
        params![status.as_str()],
        |row| row.get(0),
    )
}

/// Newest-first page across all users, joined with the owning account.
///
/// The search term matches the owner's name or NSTIN case-insensitively; submissions
/// whose owner no longer exists only appear when no search term is given.
pub fn list_with_owner(
    conn: &Connection,
    filter: &SubmissionFilter,
    page: u32,
    page_size: u32,
) -> Result<(Vec<SubmissionWithOwner>, u64), rusqlite::Error> {
    let status = filter.status.map(|s| s.as_str());
    let pattern = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(like_pattern);
    const FROM: &str = "FROM submissions s LEFT JOIN users u ON u.id = s.user_id
        WHERE (?1 IS NULL OR s.status = ?1)
          AND (?2 IS NULL OR fold(u.name) LIKE ?2 ESCAPE '\\' OR fold(u.nstin) LIKE ?2 ESCAPE '\\')";

    let total: u64 = conn.query_row(
        &format!("SELECT COUNT(*) {FROM}"),
        params![status, pattern],
        |row| row.get(0),
    )?;

    let mut stmt = conn.prepare(&format!(
        "SELECT {COLUMNS}, u.id, u.name, u.nstin, u.email {FROM}
         ORDER BY s.created_at DESC, s.rowid DESC LIMIT ?3 OFFSET ?4"
    ))?;
    let items = stmt
        .query_map(
            params![status, pattern, page_size, page_offset(page, page_size)],
            with_owner_from_row,
        )?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((items, total))
}
