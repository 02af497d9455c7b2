//! # Template Service Module
//!
//! Read side of the template catalog for signed-in users. Only active templates are
//! listed; a single template stays reachable by id after it is deactivated.
//!
//! ## Sub-modules:
//! - `list`: the catalog listings, the type picker and the active count.
//! - `download_log`: counts a template download.
//!
//! Admin-side uploads and edits live in `services::admin`.

mod download_log;
mod list;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

/// The base path for all template-related API endpoints.
const API_PATH: &str = "/api/templates";

/// Registered routes:
///
/// * `GET /` (`list::active`): active templates, newest first.
/// * `GET /types` (`list::types`): `{id, name, type}` of active templates, grouped by type.
/// * `GET /count` (`list::count`): `{count}` of active templates.
/// * `POST /download-log` (`download_log::process`): bumps the download counter of
///   `{templateId}`.
/// * `GET /{template_id}` (`list::one`): a single template, active or not.
///
/// The fixed paths are registered before `/{template_id}` so they are not captured by it.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", get().to(list::active))
        .route("/types", get().to(list::types))
        .route("/count", get().to(list::count))
        .route("/download-log", post().to(download_log::process))
        .route("/{template_id}", get().to(list::one))
}
