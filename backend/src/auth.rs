//! Bearer-token extractors.
//!
//! Handlers take [`AuthenticatedUser`] or [`AdminUser`] as an argument; a request
//! without a valid `Authorization: Bearer <token>` header never reaches the handler.

use crate::accounts::token::Claims;
use crate::error::ApiError;
use crate::state::AppState;
use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use std::future::{ready, Ready};
use taxdesk_common::model::user::Role;

/// Any signed-in account.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

/// A signed-in account holding the `admin` role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Claims);

fn bearer_claims(req: &HttpRequest) -> Result<Claims, ApiError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| ApiError::internal("application state not configured"))?;
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ApiError::Unauthorized("No token, authorization denied".to_string()))?;

    state.tokens.verify(token).map_err(|e| {
        log::warn!("Rejected bearer token: {}", e);
        ApiError::Unauthorized("Token is not valid".to_string())
    })
}

impl FromRequest for AuthenticatedUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(bearer_claims(req).map(AuthenticatedUser))
    }
}

impl FromRequest for AdminUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(bearer_claims(req).and_then(|claims| {
            if claims.role == Role::Admin {
                Ok(AdminUser(claims))
            } else {
                Err(ApiError::Forbidden)
            }
        }))
    }
}
