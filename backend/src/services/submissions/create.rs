use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::lifecycle::NewSubmission;
use crate::state::AppState;
use crate::storage::uploads::read_multipart;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use taxdesk_common::model::template::TemplateType;
use taxdesk_common::model::UnknownVariant;

pub async fn process(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let mut form = read_multipart(payload, state.max_upload_bytes).await?;

    let template_type: TemplateType = form
        .text("templateType")
        .ok_or_else(|| ApiError::validation("Template type is required"))?
        .parse()
        .map_err(|e: UnknownVariant| ApiError::validation(e.to_string()))?;
    let tax_period = form.text("taxPeriod").unwrap_or_default().to_string();
    let comments = form.text("comments").map(str::to_string);

    let submission = state
        .lifecycle
        .create(NewSubmission {
            user_id: claims.id,
            template_type,
            tax_period,
            main_file: form.take_file("mainFile"),
            supporting_doc: form.take_file("supportingDoc"),
            comments,
        })
        .await?;
    Ok(HttpResponse::Created().json(submission))
}
