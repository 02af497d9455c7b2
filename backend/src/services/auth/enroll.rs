use super::TokenResponse;
use crate::error::ApiError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use taxdesk_common::requests::EnrollRequest;

pub async fn process(
    state: web::Data<AppState>,
    body: web::Json<EnrollRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = state.accounts.enroll(body.into_inner())?;
    let token = state.tokens.issue(&user).map_err(ApiError::internal)?;
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}
