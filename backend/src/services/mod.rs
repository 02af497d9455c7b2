//! HTTP surface. Each sub-module owns one `/api/...` prefix and exposes a
//! `configure_routes()`; [`configure`] mounts them all.

pub mod admin;
pub mod auth;
pub mod submissions;
pub mod templates;
pub mod users;

use crate::error::ApiError;
use actix_web::web;

/// Largest JSON body accepted. Files travel as multipart and are not bound by this.
const JSON_LIMIT: usize = 64 * 1024;

/// Extractor settings that turn malformed JSON or query strings into the same
/// `{"message"}` 400 as every other validation failure.
pub fn extractor_config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(
        web::JsonConfig::default()
            .limit(JSON_LIMIT)
            .error_handler(|err, _| ApiError::validation(err.to_string()).into()),
    )
    .app_data(
        web::QueryConfig::default()
            .error_handler(|err, _| ApiError::validation(err.to_string()).into()),
    )
    .app_data(
        web::PathConfig::default()
            .error_handler(|err, _| ApiError::validation(err.to_string()).into()),
    );
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    extractor_config(cfg);
    cfg.service(auth::configure_routes())
        .service(users::configure_routes())
        .service(templates::configure_routes())
        .service(submissions::configure_routes())
        .service(admin::configure_routes());
}

#[cfg(test)]
mod tests;
