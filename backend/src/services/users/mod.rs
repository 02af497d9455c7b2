//! The signed-in user's own account.

mod password;
mod profile;

use actix_web::web::{get, put, scope};
use actix_web::Scope;

const API_PATH: &str = "/api/users";

pub fn configure_routes() -> Scope {
    scope(API_PATH)
        .route("/profile", get().to(profile::own))
        .route("/profile", put().to(profile::update))
        .route("/profile/{user_id}", get().to(profile::by_id))
        .route("/password", put().to(password::process))
}
