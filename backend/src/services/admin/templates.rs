use super::IdPath;
use crate::auth::AdminUser;
use crate::catalog::NewTemplate;
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::uploads::read_multipart;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde_json::json;
use taxdesk_common::requests::UpdateTemplateRequest;

/// All templates, inactive ones included.
pub async fn list(
    state: web::Data<AppState>,
    _admin: AdminUser,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.catalog.list_all()?))
}

/// Multipart upload: the file under `file`, plus `name`, `description`, `type` and
/// `version` text fields.
pub async fn upload(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut form = read_multipart(payload, state.max_upload_bytes).await?;
    let field = |name: &str| form.text(name).unwrap_or_default().to_string();
    let mut request = NewTemplate {
        name: field("name"),
        description: field("description"),
        template_type: field("type"),
        version: field("version"),
        file: None,
    };
    request.file = form.take_file("file");

    let template = state.catalog.upload(request).await?;
    log::info!("Admin {} published template {}", admin.id, template.id);
    Ok(HttpResponse::Created().json(template))
}

pub async fn update(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<IdPath>,
    body: web::Json<UpdateTemplateRequest>,
) -> Result<HttpResponse, ApiError> {
    let template = state.catalog.update(&path.id, body.into_inner())?;
    Ok(HttpResponse::Ok().json(template))
}

pub async fn deactivate(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<IdPath>,
) -> Result<HttpResponse, ApiError> {
    state.catalog.deactivate(&path.id)?;
    Ok(HttpResponse::Ok().json(json!({ "message": "Template deleted successfully" })))
}
