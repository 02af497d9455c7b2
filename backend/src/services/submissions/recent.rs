use crate::auth::AuthenticatedUser;
use crate::error::ApiError;
use crate::lifecycle::RECENT_LIMIT;
use crate::state::AppState;
use actix_web::{web, HttpResponse};

pub async fn process(
    state: web::Data<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> Result<HttpResponse, ApiError> {
    let submissions = state.lifecycle.list_recent(&claims.id, RECENT_LIMIT)?;
    Ok(HttpResponse::Ok().json(submissions))
}
