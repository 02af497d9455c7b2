use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use taxdesk_common::requests::ChangePasswordRequest;

pub async fn process(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    body: web::Json<ChangePasswordRequest>,
) -> Result<HttpResponse, ApiError> {
    state
        .accounts
        .change_password(&claims.id, body.into_inner())?;
    log::info!("Account {} changed its password", claims.id);
    Ok(HttpResponse::Ok().json(json!({ "message": "Password updated successfully" })))
}
