use crate::accounts::AccountDirectory;
use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use taxdesk_common::model::user::Role;
use taxdesk_common::requests::UpdateProfileRequest;

pub async fn own(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let user = state.accounts.find_by_id(&claims.id)?;
    Ok(HttpResponse::Ok().json(user))
}

/// Profiles of other accounts are visible to admins only.
pub async fn by_id(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    user_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    if claims.id != *user_id && claims.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }
    let user = state.accounts.find_by_id(&user_id)?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn update(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    body: web::Json<UpdateProfileRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = state.accounts.update_profile(&claims.id, body.into_inner())?;
    Ok(HttpResponse::Ok().json(user))
}
