//! Submission lifecycle: creation with its upload preconditions, and the admin review
//! that moves a submission from `pending` to `approved` or `rejected`.
//!
//! ```text
//!   create ──▶ pending ──approve──▶ approved
//!                 │
//!                 └──────reject───▶ rejected
//! ```
//!
//! Both end states are final. The review write is conditional on the row still being
//! `pending`, so two admins deciding the same submission at once produce one decision
//! and one `Conflict`.
//!
//! Collaborators are injected at construction: an [`AccountDirectory`] to resolve
//! owners, a [`DocumentStore`] for the uploaded files and a [`Notifier`] for the
//! emails. Notifications are queued after the record is written and never affect the
//! result of an operation.

use crate::accounts::AccountDirectory;
use crate::db::{self, Database};
use crate::error::ApiError;
use crate::notify::{messages, Notifier};
use crate::storage::uploads::{AllowList, UploadedFile};
use crate::storage::{DocumentCategory, DocumentStore};
use chrono::Utc;
use std::sync::Arc;
use taxdesk_common::model::document::StoredDocument;
use taxdesk_common::model::page::Page;
use taxdesk_common::model::submission::{
    Review, Submission, SubmissionFilter, SubmissionStatus, SubmissionWithOwner,
};
use taxdesk_common::model::template::TemplateType;

pub const RECENT_LIMIT: u32 = 5;
pub const ADMIN_PAGE_SIZE: u32 = 10;

/// Everything a user sends when filing a return.
#[derive(Debug, Clone)]
pub struct NewSubmission {
    pub user_id: String,
    pub template_type: TemplateType,
    pub tax_period: String,
    pub main_file: Option<UploadedFile>,
    pub supporting_doc: Option<UploadedFile>,
    pub comments: Option<String>,
}

pub struct SubmissionLifecycle {
    db: Database,
    accounts: Arc<dyn AccountDirectory>,
    documents: Arc<dyn DocumentStore>,
    notifier: Notifier,
    max_upload_bytes: usize,
    admin_email: Option<String>,
}

impl SubmissionLifecycle {
    pub fn new(
        db: Database,
        accounts: Arc<dyn AccountDirectory>,
        documents: Arc<dyn DocumentStore>,
        notifier: Notifier,
        max_upload_bytes: usize,
    ) -> Self {
        Self {
            db,
            accounts,
            documents,
            notifier,
            max_upload_bytes,
            admin_email: None,
        }
    }

    /// Address that receives a heads-up for every new submission.
    pub fn with_admin_email(mut self, admin_email: Option<String>) -> Self {
        self.admin_email = admin_email;
        self
    }

    /// Files a new return.
    ///
    /// Every check runs before the first byte is stored, and the record is written only
    /// after both documents are stored, so a failure at any step leaves no submission.
    pub async fn create(&self, request: NewSubmission) -> Result<Submission, ApiError> {
        let main_file = request
            .main_file
            .ok_or_else(|| ApiError::validation("Please upload the main template file"))?;
        let supporting_doc = request
            .supporting_doc
            .ok_or_else(|| ApiError::validation("Please upload the supporting document"))?;
        main_file.check(AllowList::Documents, self.max_upload_bytes)?;
        supporting_doc.check(AllowList::DocumentsAndImages, self.max_upload_bytes)?;

        let tax_period = request.tax_period.trim().to_string();
        if tax_period.is_empty() {
            return Err(ApiError::validation("Tax period is required"));
        }
        let owner = self.accounts.find_by_id(&request.user_id)?;

        let main = self.store(&main_file).await?;
        let supporting = self.store(&supporting_doc).await.inspect_err(|_| {
            log::warn!(
                "Supporting document failed after main file was stored as {}",
                main.reference_id
            );
        })?;

        let now = Utc::now();
        let submission = Submission {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: owner.id.clone(),
            template_type: request.template_type,
            tax_period,
            main_file: main,
            supporting_doc: supporting,
            comments: request
                .comments
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            status: SubmissionStatus::Pending,
            review: None,
            created_at: now,
            updated_at: now,
        };
        if !submission.main_file.is_complete() || !submission.supporting_doc.is_complete() {
            return Err(ApiError::internal("document store returned an empty reference"));
        }

        self.db
            .call(|conn| db::submissions::insert(conn, &submission))?;
        log::info!(
            "Submission {} ({}, {}) filed by {}",
            submission.id,
            submission.template_type,
            submission.tax_period,
            owner.id
        );

        self.notifier
            .send(messages::submission_received(&owner.email, &owner.name));
        if let Some(admin_email) = &self.admin_email {
            self.notifier.send(messages::new_submission_alert(
                admin_email,
                &owner.name,
                &owner.email,
                submission.created_at,
            ));
        }

        Ok(submission)
    }

    async fn store(&self, file: &UploadedFile) -> Result<StoredDocument, ApiError> {
        self.documents
            .store(
                DocumentCategory::Submissions,
                &file.filename,
                &file.bytes,
                &file.content_type,
            )
            .await
            .map_err(ApiError::internal)
    }

    /// Approves a pending submission. Comments are optional.
    pub fn approve(
        &self,
        submission_id: &str,
        admin_id: &str,
        review_comments: Option<String>,
    ) -> Result<Submission, ApiError> {
        self.decide(
            submission_id,
            admin_id,
            SubmissionStatus::Approved,
            review_comments.unwrap_or_default(),
        )
    }

    /// Rejects a pending submission. A rejection must say why.
    pub fn reject(
        &self,
        submission_id: &str,
        admin_id: &str,
        review_comments: Option<String>,
    ) -> Result<Submission, ApiError> {
        self.decide(
            submission_id,
            admin_id,
            SubmissionStatus::Rejected,
            review_comments.unwrap_or_default(),
        )
    }

    fn decide(
        &self,
        submission_id: &str,
        admin_id: &str,
        outcome: SubmissionStatus,
        review_comments: String,
    ) -> Result<Submission, ApiError> {
        let mut submission = self
            .db
            .call(|conn| db::submissions::find(conn, submission_id))?
            .ok_or(ApiError::NotFound("Submission"))?;

        let review_comments = review_comments.trim().to_string();
        if outcome == SubmissionStatus::Rejected && review_comments.is_empty() {
            return Err(ApiError::validation(
                "Review comments are required for rejection",
            ));
        }
        let already_decided =
            || ApiError::Conflict("Submission has already been reviewed".to_string());
        if submission.status.is_terminal() {
            return Err(already_decided());
        }

        let review = Review {
            reviewed_at: Utc::now(),
            reviewed_by: admin_id.to_string(),
            review_comments,
        };
        let changed = self.db.call(|conn| {
            db::submissions::record_review(conn, submission_id, outcome, &review)
        })?;
        if changed == 0 {
            return Err(already_decided());
        }

        submission.status = outcome;
        submission.updated_at = review.reviewed_at;
        submission.review = Some(review);
        log::info!(
            "Submission {} {} by {}",
            submission.id,
            submission.status,
            admin_id
        );

        self.notify_owner(&submission);
        Ok(submission)
    }

    fn notify_owner(&self, submission: &Submission) {
        let owner = match self.accounts.find_by_id(&submission.user_id) {
            Ok(owner) => owner,
            Err(e) => {
                log::warn!(
                    "Not notifying owner of submission {}: {}",
                    submission.id,
                    e
                );
                return;
            }
        };
        let comments = submission
            .review
            .as_ref()
            .map(|r| r.review_comments.as_str())
            .unwrap_or_default();
        let mail = match submission.status {
            SubmissionStatus::Approved => {
                messages::submission_approved(&owner.email, &owner.name, comments)
            }
            SubmissionStatus::Rejected => {
                messages::submission_declined(&owner.email, &owner.name, comments)
            }
            SubmissionStatus::Pending => return,
        };
        self.notifier.send(mail);
    }

    pub fn get(&self, submission_id: &str) -> Result<Submission, ApiError> {
        self.db
            .call(|conn| db::submissions::find(conn, submission_id))?
            .ok_or(ApiError::NotFound("Submission"))
    }

    /// The user's own submissions, newest first.
    pub fn list_recent(&self, user_id: &str, limit: u32) -> Result<Vec<Submission>, ApiError> {
        self.db
            .call(|conn| db::submissions::list_for_user(conn, user_id, limit))
    }

    pub fn admin_list(
        &self,
        filter: &SubmissionFilter,
        page: u32,
        page_size: u32,
    ) -> Result<Page<SubmissionWithOwner>, ApiError> {
        let page = page.max(1);
        let (items, total) = self
            .db
            .call(|conn| db::submissions::list_with_owner(conn, filter, page, page_size))?;
        Ok(Page::new(items, page, page_size, total))
    }

    pub fn count_pending(&self) -> Result<u64, ApiError> {
        self.db
            .call(|conn| db::submissions::count_by_status(conn, SubmissionStatus::Pending))
    }
}

#[cfg(test)]
mod tests;
