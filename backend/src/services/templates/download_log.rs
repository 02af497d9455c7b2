//! `POST /api/templates/download-log`: the client calls this right before it follows a
//! template's `fileUrl`, so the counter reflects download intents rather than served bytes.

use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use taxdesk_common::requests::DownloadLogRequest;

pub async fn process(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    body: web::Json<DownloadLogRequest>,
) -> Result<HttpResponse, ApiError> {
    state.catalog.log_download(&body.template_id)?;
    log::debug!("Template {} downloaded by {}", body.template_id, claims.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Download logged successfully" })))
}
