//! Review queue. `status=all` (or no status) lists every submission; `search` matches the
//! owner's name or NSTIN.

use super::{page_of, IdPath};
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::lifecycle::ADMIN_PAGE_SIZE;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use taxdesk_common::model::submission::{SubmissionFilter, SubmissionStatus};
use taxdesk_common::model::UnknownVariant;
use taxdesk_common::requests::{ListQuery, ReviewRequest};

fn filter_from(query: &ListQuery) -> Result<SubmissionFilter, ApiError> {
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") | Some("all") => None,
        Some(status) => Some(
            status
                .parse::<SubmissionStatus>()
                .map_err(|e: UnknownVariant| ApiError::validation(e.to_string()))?,
        ),
    };
    let search = query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);
    Ok(SubmissionFilter { status, search })
}

pub async fn list(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let filter = filter_from(&query)?;
    let page = state
        .lifecycle
        .admin_list(&filter, page_of(query.page), ADMIN_PAGE_SIZE)?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn one(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<IdPath>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.lifecycle.get(&path.id)?))
}

/// Approval comments from a raw body. Only an empty body means "no comments"; anything
/// else must be a valid `ReviewRequest`.
fn approval_comments(body: &[u8]) -> Result<Option<String>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<ReviewRequest>(body)
        .map(|request| request.review_comments)
        .map_err(|e| ApiError::validation(format!("Malformed request body: {}", e)))
}

pub async fn approve(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    path: web::Path<IdPath>,
    body: web::Bytes,
) -> Result<HttpResponse, ApiError> {
    let comments = approval_comments(&body)?;
    let submission = state.lifecycle.approve(&path.id, &admin.id, comments)?;
    Ok(HttpResponse::Ok().json(submission))
}

pub async fn reject(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    path: web::Path<IdPath>,
    body: web::Json<ReviewRequest>,
) -> Result<HttpResponse, ApiError> {
    let submission = state
        .lifecycle
        .reject(&path.id, &admin.id, body.into_inner().review_comments)?;
    Ok(HttpResponse::Ok().json(submission))
}
