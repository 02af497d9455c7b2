//! Template catalog: the blank forms users download before filing.
//!
//! Templates are never deleted. Deactivation hides a template from users while keeping
//! it reachable by id, so links in older submissions keep working.

use crate::db::{self, Database};
use crate::error::ApiError;
use crate::storage::uploads::{AllowList, UploadedFile};
use crate::storage::{DocumentCategory, DocumentStore};
use chrono::Utc;
use std::sync::Arc;
use taxdesk_common::model::template::{Template, TemplateSummary, TemplateType};
use taxdesk_common::requests::UpdateTemplateRequest;

/// Admin upload form, as read from the multipart body.
#[derive(Debug, Clone, Default)]
pub struct NewTemplate {
    pub name: String,
    pub description: String,
    pub template_type: String,
    pub version: String,
    pub file: Option<UploadedFile>,
}

#[derive(Clone)]
pub struct TemplateCatalog {
    db: Database,
    documents: Arc<dyn DocumentStore>,
    max_upload_bytes: usize,
}

fn required(value: &str, field: &str) -> Result<String, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ApiError::validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn parse_type(value: &str) -> Result<TemplateType, ApiError> {
    value
        .parse()
        .map_err(|e: taxdesk_common::model::UnknownVariant| ApiError::validation(e.to_string()))
}

/// Text after the last `.`, or `None` when the name has no extension.
fn extension_of(filename: &str) -> Option<String> {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.trim().to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
}

impl TemplateCatalog {
    pub fn new(db: Database, documents: Arc<dyn DocumentStore>, max_upload_bytes: usize) -> Self {
        Self {
            db,
            documents,
            max_upload_bytes,
        }
    }

    pub async fn upload(&self, request: NewTemplate) -> Result<Template, ApiError> {
        let name = required(&request.name, "Name")?;
        let description = required(&request.description, "Description")?;
        let version = required(&request.version, "Version")?;
        let template_type = parse_type(request.template_type.trim())?;
        let file = request
            .file
            .ok_or_else(|| ApiError::validation("Please upload a file"))?;
        file.check(AllowList::Documents, self.max_upload_bytes)?;

        let stored = self
            .documents
            .store(
                DocumentCategory::Templates,
                &file.filename,
                &file.bytes,
                &file.content_type,
            )
            .await
            .map_err(ApiError::internal)?;
        if !stored.is_complete() {
            return Err(ApiError::internal("document store returned an empty reference"));
        }

        let now = Utc::now();
        let template = Template {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            description,
            template_type,
            file_url: stored.url,
            file_reference: stored.reference_id,
            version,
            file_extension: extension_of(&file.filename),
            original_filename: Some(file.filename),
            download_count: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        self.db.call(|conn| db::templates::insert(conn, &template))?;
        log::info!(
            "Template {} ({}, v{}) uploaded",
            template.id,
            template.template_type,
            template.version
        );
        Ok(template)
    }

    /// Edits metadata. Blank text fields are ignored rather than stored.
    pub fn update(&self, id: &str, changes: UpdateTemplateRequest) -> Result<Template, ApiError> {
        let non_blank = |value: Option<String>| {
            value
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let changes = UpdateTemplateRequest {
            name: non_blank(changes.name),
            description: non_blank(changes.description),
            template_type: changes.template_type,
            version: non_blank(changes.version),
        };
        let changed = self
            .db
            .call(|conn| db::templates::update_metadata(conn, id, &changes, &Utc::now()))?;
        if changed == 0 {
            return Err(ApiError::NotFound("Template"));
        }
        self.get(id)
    }

    pub fn deactivate(&self, id: &str) -> Result<(), ApiError> {
        let changed = self
            .db
            .call(|conn| db::templates::deactivate(conn, id, &Utc::now()))?;
        if changed == 0 {
            return Err(ApiError::NotFound("Template"));
        }
        log::info!("Template {} deactivated", id);
        Ok(())
    }

    /// Counts one download. Every call counts, repeated or not.
    pub fn log_download(&self, id: &str) -> Result<(), ApiError> {
        let changed = self
            .db
            .call(|conn| db::templates::increment_downloads(conn, id))?;
        if changed == 0 {
            return Err(ApiError::NotFound("Template"));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Template, ApiError> {
        self.db
            .call(|conn| db::templates::find(conn, id))?
            .ok_or(ApiError::NotFound("Template"))
    }

    pub fn list_active(&self) -> Result<Vec<Template>, ApiError> {
        self.db.call(|conn| db::templates::list(conn, true))
    }

    pub fn list_all(&self) -> Result<Vec<Template>, ApiError> {
        self.db.call(|conn| db::templates::list(conn, false))
    }

    pub fn list_types(&self) -> Result<Vec<TemplateSummary>, ApiError> {
        self.db.call(db::templates::list_active_summaries)
    }

    pub fn count_active(&self) -> Result<u64, ApiError> {
        self.db.call(db::templates::count_active)
    }
}
