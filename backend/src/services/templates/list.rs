use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;

pub async fn active(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.catalog.list_active()?))
}

pub async fn types(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.catalog.list_types()?))
}

pub async fn count(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let count = state.catalog.count_active()?;
    Ok(HttpResponse::Ok().json(json!({ "count": count })))
}

pub async fn one(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    template_id: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    Ok(HttpResponse::Ok().json(state.catalog.get(&template_id)?))
}
