//! A user's own tax return submissions.

mod create;
mod recent;

use actix_web::web::{get, post, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/submissions";

/// Registered routes:
///
/// * `POST /` (`create::process`): files a return. The body is `multipart/form-data`
///   with the files `mainFile` and `supportingDoc` and the text fields `templateType`,
///   `taxPeriod` and `comments`.
/// * `GET /recent` (`recent::process`): the caller's five newest submissions.
pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("", post().to(create::process))
        .route("/recent", get().to(recent::process))
}
