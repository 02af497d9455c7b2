use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::lifecycle::RECENT_LIMIT;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::Serialize;
use taxdesk_common::model::submission::{SubmissionFilter, SubmissionStatus, SubmissionWithOwner};
use taxdesk_common::model::template::TemplateType;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RecentEntry {
    id: String,
    nstin: Option<String>,
    user_name: Option<String>,
    template_type: TemplateType,
    status: SubmissionStatus,
    submitted_at: DateTime<Utc>,
}

impl From<SubmissionWithOwner> for RecentEntry {
    fn from(entry: SubmissionWithOwner) -> Self {
        let (nstin, user_name) = match entry.owner {
            Some(owner) => (Some(owner.nstin), Some(owner.name)),
            None => (None, None),
        };
        RecentEntry {
            id: entry.submission.id,
            nstin,
            user_name,
            template_type: entry.submission.template_type,
            status: entry.submission.status,
            submitted_at: entry.submission.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DashboardStats {
    total_users: u64,
    total_templates: u64,
    pending_submissions: u64,
    recent_submissions: Vec<RecentEntry>,
}

pub async fn process(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, ApiError> {
    let recent = state
        .lifecycle
        .admin_list(&SubmissionFilter::default(), 1, RECENT_LIMIT)?;
    let stats = DashboardStats {
        total_users: state.accounts.count_citizens()?,
        total_templates: state.catalog.count_active()?,
        pending_submissions: state.lifecycle.count_pending()?,
        recent_submissions: recent.items.into_iter().map(RecentEntry::from).collect(),
    };
    Ok(HttpResponse::Ok().json(stats))
}
