use super::TokenResponse;
use crate::error::ApiError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use taxdesk_common::requests::LoginRequest;

pub async fn process(
    state: web::Data<AppState>,
    body: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = state.accounts.login(body.into_inner())?;
    let token = state.tokens.issue(&user).map_err(ApiError::internal)?;
    log::info!("Account {} signed in", user.id);
    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}
