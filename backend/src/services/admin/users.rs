use super::{page_of, IdPath};
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::state::AppState;
use actix_web::{web, HttpResponse};
use serde_json::json;
use taxdesk_common::requests::{CreateUserRequest, ListQuery, UpdateUserRequest};

pub async fn list(
    state: web::Data<AppState>,
    _admin: AdminUser,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = state
        .accounts
        .list(query.search.as_deref(), page_of(query.page))?;
    Ok(HttpResponse::Ok().json(page))
}

pub async fn create(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    body: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = state.accounts.create(body.into_inner())?;
    log::info!("Admin {} created account {}", admin.id, user.id);
    Ok(HttpResponse::Created().json(user))
}

pub async fn update(
    state: web::Data<AppState>,
    _admin: AdminUser,
    path: web::Path<IdPath>,
    body: web::Json<UpdateUserRequest>,
) -> Result<HttpResponse, ApiError> {
    let user = state.accounts.admin_update(&path.id, body.into_inner())?;
    Ok(HttpResponse::Ok().json(user))
}

pub async fn remove(
    state: web::Data<AppState>,
    AdminUser(admin): AdminUser,
    path: web::Path<IdPath>,
) -> Result<HttpResponse, ApiError> {
    if admin.id == path.id {
        return Err(ApiError::validation("You cannot delete your own account"));
    }
    state.accounts.delete(&path.id)?;
    Ok(HttpResponse::Ok().json(json!({ "message": "User deleted successfully" })))
}
