//! Back-office endpoints. Every handler here takes an [`AdminUser`](crate::auth::AdminUser),
//! so non-admin tokens get `403`.

mod dashboard;
mod submissions;
mod templates;
mod users;

use actix_web::web::{delete, get, post, put, scope};
use actix_web::Scope;
use serde::Deserialize;

const API_PATH: &str = "/api/admin";

/// `?page=` with 1 as default and floor.
fn page_of(page: Option<u32>) -> u32 {
    page.unwrap_or(1).max(1)
}

#[derive(Debug, Deserialize)]
struct IdPath {
    id: String,
}

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/dashboard", get().to(dashboard::process))
        .route("/users", get().to(users::list))
        .route("/users", post().to(users::create))
        .route("/users/{id}", put().to(users::update))
        .route("/users/{id}", delete().to(users::remove))
        .route("/submissions", get().to(submissions::list))
        .route("/submissions/{id}", get().to(submissions::one))
        .route("/submissions/{id}/approve", put().to(submissions::approve))
        .route("/submissions/{id}/reject", put().to(submissions::reject))
        .route("/templates", get().to(templates::list))
        .route("/templates", post().to(templates::upload))
        .route("/templates/{id}", put().to(templates::update))
        .route("/templates/{id}", delete().to(templates::deactivate))
}
